//! Adapters 命令

use accelkit_core::Config;
use accelkit_device::{
    select_adapter, AdapterDescriptor, AdapterEnumeration, AdapterEnumerator, AdapterSelection, BootstrapNotice,
    BootstrapOptions, NameFilter,
};
use anyhow::Result;

pub async fn run(config: &Config, filter: Option<String>, inventory: Option<&str>) -> Result<()> {
    let platform = super::open_platform(config, inventory)?;
    let mut options = BootstrapOptions::from(&config.accelerator);
    if let Some(filter) = filter {
        options.name_filter = NameFilter::new(filter);
    }

    let enumeration =
        tokio::task::spawn_blocking(move || AdapterEnumerator::new(platform).enumerate()).await??;
    let tier = enumeration.tier;
    let (table, selection, notices) = rank(enumeration, &options)?;

    println!("Discovery tier: {}", tier);
    println!(
        "Preferences:    {}",
        options
            .preferences
            .preferences()
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(" > ")
    );
    println!("Name filter:    \"{}\"\n", options.name_filter.pattern());

    println!("{:<5} {:<5} {:<32} {:<10} {:<10}", "RANK", "ENUM", "DESCRIPTION", "HARDWARE", "INTEGRATED");
    for (rank, adapter) in table.iter().enumerate() {
        let marker = if rank == selection.index { " *" } else { "" };
        println!(
            "{:<5} {:<5} {:<32} {:<10} {:<10}{}",
            rank,
            adapter.enumeration_index,
            adapter.description,
            flag(adapter.traits.hardware),
            flag(adapter.traits.integrated),
            marker
        );
    }

    if !notices.is_empty() {
        println!();
    }
    for notice in &notices {
        super::print_notice(notice);
    }

    Ok(())
}

/// 与引导流程相同的排序和选择，附带排序后的完整列表
fn rank(
    enumeration: AdapterEnumeration,
    options: &BootstrapOptions,
) -> Result<(Vec<AdapterDescriptor>, AdapterSelection, Vec<BootstrapNotice>)> {
    let mut table = enumeration.adapters.clone();
    options.preferences.sort(&mut table);

    let selection = select_adapter(enumeration.adapters, &options.preferences, &options.name_filter)?;

    let mut notices = enumeration.notices;
    notices.extend(selection.notice(&options.name_filter));
    Ok((table, selection, notices))
}

fn flag(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "yes",
        Some(false) => "no",
        None => "unknown",
    }
}
