use super::*;
use crate::cache::{PackageCache, PackageId};
use crate::error::SortError;
use crate::loader::{Channel, MemoryLoader, PackageInfo};
use crate::transaction::{ChangeSet, Operation};

fn load_cache(infos: Vec<PackageInfo>) -> PackageCache {
    let mut cache = PackageCache::new();
    cache.add_loader(Box::new(MemoryLoader::new(Channel::new("test", 0), infos)));
    cache.load().unwrap();
    cache
}

fn by_name(cache: &PackageCache, name: &str) -> PackageId {
    let ids = cache.packages_by_name(name);
    assert_eq!(ids.len(), 1, "expected exactly one {}", name);
    ids[0]
}

fn position(plan: &[ChangeStep], step: ChangeStep) -> usize {
    plan.iter()
        .position(|&s| s == step)
        .unwrap_or_else(|| panic!("{:?} missing from plan {:?}", step, plan))
}

// ==== element sorter ====

#[test]
fn test_empty_sorter_yields_empty_order() {
    let mut sorter: ElementSorter<u32> = ElementSorter::new();
    assert_eq!(sorter.get_sorted().unwrap(), Vec::<u32>::new());
}

#[test]
fn test_isolated_elements_keep_insertion_order() {
    let mut sorter = ElementSorter::new();
    for elem in [30u32, 10, 20] {
        sorter.add_element(elem);
    }
    assert_eq!(sorter.get_sorted().unwrap(), vec![30, 10, 20]);
}

#[test]
fn test_chain_orders_predecessors_first() {
    let mut sorter = ElementSorter::new();
    sorter.add_successor(1u32, 2, EdgeKind::Enforce);
    sorter.add_successor(2, 3, EdgeKind::Optional);
    assert_eq!(sorter.get_sorted().unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_acyclic_graph_keeps_all_edges() {
    let mut sorter = ElementSorter::new();
    sorter.add_successor(1u32, 2, EdgeKind::Optional);
    sorter.add_successor(1, 3, EdgeKind::Optional);
    sorter.add_successor(2, 3, EdgeKind::Enforce);
    sorter.break_loops().unwrap();
    assert_eq!(sorter.edge_count(), 3);
}

#[test]
fn test_optional_cycle_broken_with_single_edge() {
    let mut sorter = ElementSorter::new();
    sorter.add_successor(1u32, 2, EdgeKind::Optional);
    sorter.add_successor(2, 1, EdgeKind::Optional);
    sorter.break_loops().unwrap();
    assert_eq!(sorter.edge_count(), 1);
    assert_eq!(sorter.get_sorted().unwrap().len(), 2);
}

#[test]
fn test_enforce_cycle_cannot_be_broken() {
    let mut sorter = ElementSorter::new();
    sorter.add_successor(1u32, 2, EdgeKind::Enforce);
    sorter.add_successor(2, 1, EdgeKind::Enforce);
    let cycle = sorter.break_loops().unwrap_err();
    assert_eq!(cycle.len(), 2);
    assert!(cycle.contains(&1) && cycle.contains(&2));
    assert!(matches!(sorter.get_sorted(), Err(SortError::Loop(_))));
}

#[test]
fn test_mixed_cycle_sacrifices_the_optional_edge() {
    let mut sorter = ElementSorter::new();
    sorter.add_successor(1u32, 2, EdgeKind::Enforce);
    sorter.add_successor(2, 1, EdgeKind::Optional);
    assert_eq!(sorter.get_sorted().unwrap(), vec![1, 2]);
}

#[test]
fn test_or_group_member_breaks_when_sibling_survives() {
    let (p1, p2, dep) = (1u32, 2, 3);
    let mut sorter = ElementSorter::new();
    let group = sorter.new_group(GroupKind::Or);
    sorter.add_successor_in(group, p1, dep, EdgeKind::Enforce);
    sorter.add_successor_in(group, p2, dep, EdgeKind::Enforce);
    sorter.add_successor(dep, p1, EdgeKind::Enforce);

    let sorted = sorter.get_sorted().unwrap();

    // The p1 edge fell, the sibling still orders p2 before dep.
    assert_eq!(sorted, vec![p2, dep, p1]);
}

#[test]
fn test_or_group_last_member_is_not_breakable() {
    let mut sorter = ElementSorter::new();
    let group = sorter.new_group(GroupKind::Or);
    sorter.add_successor_in(group, 1u32, 2, EdgeKind::Enforce);
    sorter.add_successor(2, 1, EdgeKind::Enforce);
    assert!(sorter.break_loops().is_err());
}

#[test]
fn test_and_group_falls_together() {
    let mut sorter = ElementSorter::new();
    let group = sorter.new_group(GroupKind::And);
    sorter.add_successor_in(group, 1u32, 2, EdgeKind::Optional);
    sorter.add_successor_in(group, 3, 4, EdgeKind::Optional);
    sorter.add_successor(2, 1, EdgeKind::Enforce);

    sorter.break_loops().unwrap();

    // Breaking 1 -> 2 took 3 -> 4 with it.
    assert_eq!(sorter.edge_count(), 1);
    assert_eq!(sorter.get_sorted().unwrap(), vec![2, 3, 4, 1]);
}

#[test]
fn test_and_group_with_enforce_member_is_unbreakable() {
    let mut sorter = ElementSorter::new();
    let group = sorter.new_group(GroupKind::And);
    sorter.add_successor_in(group, 1u32, 2, EdgeKind::Optional);
    sorter.add_successor_in(group, 3, 4, EdgeKind::Enforce);
    sorter.add_successor(2, 1, EdgeKind::Enforce);
    assert!(sorter.break_loops().is_err());
}

#[test]
fn test_self_edges_are_ignored() {
    let mut sorter = ElementSorter::new();
    sorter.add_successor(1u32, 1, EdgeKind::Enforce);
    assert_eq!(sorter.edge_count(), 0);
    assert_eq!(sorter.get_sorted().unwrap(), vec![1]);
}

#[test]
fn test_duplicate_edge_upgrades_to_enforce() {
    let mut sorter = ElementSorter::new();
    sorter.add_successor(1u32, 2, EdgeKind::Optional);
    sorter.add_successor(1, 2, EdgeKind::Enforce);
    sorter.add_successor(2, 1, EdgeKind::Optional);

    // Were 1 -> 2 still optional it would break first, reversing the
    // emitted order.
    assert_eq!(sorter.get_sorted().unwrap(), vec![1, 2]);
}

// ==== changeset sorter ====

#[test]
fn test_plan_installs_dependencies_first() {
    let cache = load_cache(vec![
        PackageInfo::new("a", "1.0").requires("b-cap"),
        PackageInfo::new("b", "1.0").provides("b-cap").requires("c-cap"),
        PackageInfo::new("c", "1.0").provides("c-cap"),
    ]);
    let (a, b, c) = (
        by_name(&cache, "a"),
        by_name(&cache, "b"),
        by_name(&cache, "c"),
    );
    let mut cs = ChangeSet::default();
    for pkg in [a, b, c] {
        cs.set_install(&cache, pkg);
    }

    let plan = sort_changeset(&cache, &cs).unwrap();

    assert_eq!(plan.len(), 3);
    let pos_a = position(&plan, (a, Operation::Install));
    let pos_b = position(&plan, (b, Operation::Install));
    let pos_c = position(&plan, (c, Operation::Install));
    assert!(pos_c < pos_b && pos_b < pos_a, "bad plan {:?}", plan);
}

#[test]
fn test_removed_upgrade_victim_goes_before_the_install() {
    let cache = load_cache(vec![
        PackageInfo::new("tool", "2.0").upgrades("tool-api"),
        PackageInfo::new("old-tool", "1.0").provides("tool-api").installed(),
    ]);
    let new = by_name(&cache, "tool");
    let old = by_name(&cache, "old-tool");
    let mut cs = ChangeSet::default();
    cs.set_install(&cache, new);
    cs.set_remove(&cache, old);

    let plan = sort_changeset(&cache, &cs).unwrap();

    let remove = position(&plan, (old, Operation::Remove));
    let install = position(&plan, (new, Operation::Install));
    assert!(remove < install, "bad plan {:?}", plan);
}

#[test]
fn test_conflicting_removal_precedes_the_install() {
    let cache = load_cache(vec![
        PackageInfo::new("ours", "1.0").conflicts("theirs-cap"),
        PackageInfo::new("theirs", "1.0").provides("theirs-cap").installed(),
    ]);
    let ours = by_name(&cache, "ours");
    let theirs = by_name(&cache, "theirs");
    let mut cs = ChangeSet::default();
    cs.set_install(&cache, ours);
    cs.set_remove(&cache, theirs);

    let plan = sort_changeset(&cache, &cs).unwrap();

    let remove = position(&plan, (theirs, Operation::Remove));
    let install = position(&plan, (ours, Operation::Install));
    assert!(remove < install, "bad plan {:?}", plan);
}

#[test]
fn test_soft_requirement_cycle_is_broken() {
    let cache = load_cache(vec![
        PackageInfo::new("a", "1.0").provides("a-cap").requires("b-cap"),
        PackageInfo::new("b", "1.0").provides("b-cap").requires("a-cap"),
    ]);
    let mut cs = ChangeSet::default();
    cs.set_install(&cache, by_name(&cache, "a"));
    cs.set_install(&cache, by_name(&cache, "b"));

    let plan = sort_changeset(&cache, &cs).unwrap();

    assert_eq!(plan.len(), 2);
}

#[test]
fn test_prerequire_cycle_fails_with_loop_error() {
    let cache = load_cache(vec![
        PackageInfo::new("a", "1.0").provides("a-cap").prerequires("b-cap"),
        PackageInfo::new("b", "1.0").provides("b-cap").prerequires("a-cap"),
    ]);
    let mut cs = ChangeSet::default();
    cs.set_install(&cache, by_name(&cache, "a"));
    cs.set_install(&cache, by_name(&cache, "b"));

    let err = sort_changeset(&cache, &cs).unwrap_err();

    match err {
        SortError::Loop(desc) => {
            assert!(desc.contains("install a-1.0"), "bad description {}", desc);
            assert!(desc.contains("install b-1.0"), "bad description {}", desc);
        }
        other => panic!("expected a loop error, got {}", other),
    }
}

#[test]
fn test_removed_requirer_precedes_removed_provider() {
    let cache = load_cache(vec![
        PackageInfo::new("app", "1.0").requires("lib-cap").installed(),
        PackageInfo::new("lib", "1.0").provides("lib-cap").installed(),
    ]);
    let app = by_name(&cache, "app");
    let lib = by_name(&cache, "lib");
    let mut cs = ChangeSet::default();
    cs.set_remove(&cache, app);
    cs.set_remove(&cache, lib);

    let plan = sort_changeset(&cache, &cs).unwrap();

    let app_pos = position(&plan, (app, Operation::Remove));
    let lib_pos = position(&plan, (lib, Operation::Remove));
    assert!(app_pos < lib_pos, "bad plan {:?}", plan);
}

#[test]
fn test_requirement_satisfied_by_staying_package_adds_no_edge() {
    let cache = load_cache(vec![
        PackageInfo::new("app", "1.0").requires("lib-cap"),
        PackageInfo::new("lib", "1.0").provides("lib-cap").installed(),
        PackageInfo::new("lib-next", "2.0").provides("lib-cap"),
    ]);
    let app = by_name(&cache, "app");
    let lib_next = by_name(&cache, "lib-next");
    let mut cs = ChangeSet::default();
    cs.set_install(&cache, app);
    cs.set_install(&cache, lib_next);

    let plan = sort_changeset(&cache, &cs).unwrap();

    // The installed lib already satisfies app, so app need not wait
    // for lib-next and keeps its insertion position.
    assert_eq!(
        plan,
        vec![(app, Operation::Install), (lib_next, Operation::Install)]
    );
}

#[test]
fn test_multi_provider_requirement_keeps_one_ordering() {
    let cache = load_cache(vec![
        PackageInfo::new("app", "1.0").provides("app-cap").requires("plugin"),
        PackageInfo::new("plugin-a", "1.0").provides("plugin").requires("app-cap"),
        PackageInfo::new("plugin-b", "1.0").provides("plugin"),
    ]);
    let app = by_name(&cache, "app");
    let plugin_a = by_name(&cache, "plugin-a");
    let plugin_b = by_name(&cache, "plugin-b");
    let mut cs = ChangeSet::default();
    for pkg in [app, plugin_a, plugin_b] {
        cs.set_install(&cache, pkg);
    }

    let plan = sort_changeset(&cache, &cs).unwrap();

    // The app/plugin-a cycle is broken while plugin-b still precedes
    // app through the surviving group edge.
    assert_eq!(plan.len(), 3);
    let app_pos = position(&plan, (app, Operation::Install));
    let b_pos = position(&plan, (plugin_b, Operation::Install));
    assert!(b_pos < app_pos, "bad plan {:?}", plan);
}

#[test]
fn test_empty_changeset_yields_empty_plan() {
    let cache = load_cache(vec![PackageInfo::new("solo", "1.0")]);
    let plan = sort_changeset(&cache, &ChangeSet::default()).unwrap();
    assert!(plan.is_empty());
}
