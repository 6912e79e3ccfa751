use taskflow::output::{format_human, HumanOutput};

#[test]
fn format_human_includes_sections() {
    let mut human = HumanOutput::new("taskflow init: initialized store");
    human.push_summary("root", "/tmp/tracker");
    human.push_detail("created .taskflow.toml");
    human.push_warning("children detached: 4");
    human.push_next_step("taskflow actor set <name>");

    let rendered = format_human(&human);
    assert!(rendered.contains("taskflow init: initialized store"));
    assert!(rendered.contains("Summary:"));
    assert!(rendered.contains("- root: /tmp/tracker"));
    assert!(rendered.contains("Details:"));
    assert!(rendered.contains("- created .taskflow.toml"));
    assert!(rendered.contains("Warnings:"));
    assert!(rendered.contains("- children detached: 4"));
    assert!(rendered.contains("Next steps:"));
    assert!(rendered.contains("- taskflow actor set <name>"));
}

#[test]
fn format_human_omits_empty_sections() {
    let human = HumanOutput::new("taskflow init: nothing to do");
    let rendered = format_human(&human);
    assert_eq!(rendered, "taskflow init: nothing to do");
}
