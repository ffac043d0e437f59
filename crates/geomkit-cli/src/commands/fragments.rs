use super::load_registry;
use crate::config::AppConfig;
use crate::error::Result;
use geomkit::core::fragments::registry::FragmentRegistry;
use std::fmt::Write as _;

pub fn run(config: &AppConfig) -> Result<()> {
    let registry = load_registry(config)?;
    print!("{}", fragment_table(&registry));
    Ok(())
}

fn fragment_table(registry: &FragmentRegistry) -> String {
    let mut out = String::new();
    for fragment in registry.iter() {
        let root = fragment
            .root_element()
            .map(|e| e.symbol().to_string())
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{:<12} {:>3} atom(s)  root {:<3} {}",
            fragment.name,
            fragment.len(),
            root,
            fragment.description
        );
    }
    out
}
