use corten_pm::loader::{Channel, MemoryLoader, PackageInfo};
use corten_pm::sorter::sort_changeset;
use corten_pm::transaction::Task;
use corten_pm::{Operation, PackageCache, PolicyInstall, PolicyUpgrade, Transaction};

fn main() -> anyhow::Result<()> {
    // RUST_LOG=corten_pm=trace shows the branches the resolver tried.
    env_logger::init();

    println!("Transaction Resolver Demo\n");

    // An installed system: an editor with its spell checker, plus an
    // aging notification tray.
    let system = MemoryLoader::new(
        Channel::new("system", 0),
        vec![
            PackageInfo::new("editor", "1.0")
                .provides("editor = 1.0")
                .requires("spell-core"),
            PackageInfo::new("spell-lite", "1.0").provides("spell-core"),
            PackageInfo::new("tray", "0.9")
                .provides("tray = 0.9")
                .provides("tray-api"),
        ],
    )
    .with_installed(true);

    // A repository channel offering newer material.
    let repo = MemoryLoader::new(
        Channel::new("repo", 10),
        vec![
            PackageInfo::new("editor", "2.0")
                .provides("editor = 2.0")
                .requires("spell-core")
                .upgrades("editor < 2.0"),
            PackageInfo::new("spell-full", "3.0")
                .provides("spell-core")
                .requires("dict-en"),
            PackageInfo::new("dict-en", "1.2"),
            PackageInfo::new("shiny-tray", "1.0")
                .provides("tray-api")
                .conflicts("tray"),
        ],
    );

    println!("1. Loading channels into the cache...");
    let mut cache = PackageCache::new();
    cache.add_loader(Box::new(system));
    cache.add_loader(Box::new(repo));
    cache.load()?;
    println!("   {} packages known", cache.package_ids().count());
    println!();

    println!("2. Upgrading everything upgradable...");
    let installed: Vec<_> = cache
        .package_ids()
        .filter(|&pkg| cache.package(pkg).installed)
        .collect();
    let mut trans = Transaction::new(&cache, Box::new(PolicyUpgrade::new()));
    trans.upgrade(&installed)?;
    print!("{}", trans.changeset().describe(&cache));
    println!();

    println!("3. Installing the full spell checker on top...");
    let mut trans = Transaction::new(&cache, Box::new(PolicyInstall::new()));
    for &pkg in cache.packages_by_name("spell-full") {
        trans.install(pkg)?;
    }
    print!("{}", trans.changeset().describe(&cache));
    println!();

    println!("4. Installing a package that conflicts with the system...");
    for &pkg in cache.packages_by_name("shiny-tray") {
        trans.install(pkg)?;
    }
    print!("{}", trans.changeset().describe(&cache));
    println!();

    println!("5. Queueing mixed goals and running them at once...");
    let mut trans = Transaction::new(&cache, Box::new(PolicyInstall::new()));
    for &pkg in cache.packages_by_name("shiny-tray") {
        trans.enqueue(pkg, Task::Install);
    }
    for &pkg in cache.packages_by_name("spell-full") {
        trans.enqueue(pkg, Task::Install);
    }
    trans.run()?;
    trans.minimize();
    print!("{}", trans.changeset().describe(&cache));
    println!("   Total weight: {}", trans.weight());
    println!();

    println!("6. Ordering the winning change set into a commit plan...");
    let plan = sort_changeset(&cache, trans.changeset())?;
    for (step, (pkg, op)) in plan.iter().enumerate() {
        let verb = match op {
            Operation::Install => "install",
            Operation::Remove => "remove ",
        };
        println!("   {}. {} {}", step + 1, verb, cache.package(*pkg));
    }
    println!();

    println!("Demo completed successfully!");

    Ok(())
}
