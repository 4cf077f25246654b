#![no_main]

use buildwire_debug::{ControlCommand, KnownProperties};
use buildwire_report::Project;
use libfuzzer_sys::fuzz_target;

const MAX_INPUT_BYTES: usize = 4096;
const MAX_PROPERTIES: usize = 16;

fn project_from(text: &str) -> Project {
    let project = Project::new("fuzz");
    for (index, pair) in text.split(';').take(MAX_PROPERTIES).enumerate() {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        project.set_property(format!("{index}.{name}"), value);
    }
    project
}

fuzz_target!(|data: &[u8]| {
    let capped = &data[..data.len().min(MAX_INPUT_BYTES)];
    let text = String::from_utf8_lossy(capped);
    for line in text.lines() {
        if let Ok(Some(ControlCommand::AddBreakpoint(n) | ControlCommand::RemoveBreakpoint(n))) =
            ControlCommand::parse(line)
        {
            assert!(line.contains(&n.to_string()));
        }
    }

    let project = project_from(&text);
    let mut known = KnownProperties::new();
    assert!(known.snapshot(&project.properties()).starts_with("properties,"));
    assert_eq!(known.snapshot(&project.properties()), "properties,");
});
