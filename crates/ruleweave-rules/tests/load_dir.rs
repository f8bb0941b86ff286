#![allow(missing_docs, unused_results)]

use std::fs;
use std::path::Path;

use assert_matches::assert_matches;
use ruleweave_rules::{
    ActiveRuleSet, CancellationToken, ComposeOptions, DiscoveryConfig, RuleError, RuleSet,
};

fn write_rule(root: &Path, relative: &str, description: &str, globs: &str, body: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(
        path,
        format!("---\ndescription: {description}\nglobs: {globs}\n---\n{body}"),
    )
    .unwrap();
}

#[test]
fn loads_and_composes_from_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    write_rule(root, "base.md", "Base", "**/*", "Base guidance.");
    write_rule(
        root,
        "rust/errors.mdc",
        "Errors",
        "src/**/*.rs, tests/**/*.rs",
        "Errors: @file:rust/shared.mdc",
    );
    write_rule(root, "rust/shared.mdc", "Shared", "\"never/**\"", "Shared note.");
    write_rule(root, "web.mdc", "Web", "**/*.{ts,tsx}", "Web only.");

    let rules =
        RuleSet::load_dir(&DiscoveryConfig::new(root), &CancellationToken::new()).unwrap();
    assert_eq!(
        rules.ids().collect::<Vec<_>>(),
        vec!["base", "rust/errors", "rust/shared", "web"]
    );

    let bundle = ruleweave_rules::compose(&rules, "src/a/b.rs", &ComposeOptions::default()).unwrap();
    assert_eq!(bundle.render(), "Errors: Shared note.\n\nBase guidance.");
}

#[test]
fn file_without_frontmatter_is_malformed() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("loose.md"), "no header here").unwrap();

    let err = RuleSet::load_dir(&DiscoveryConfig::new(tmp.path()), &CancellationToken::new())
        .unwrap_err();
    assert_matches!(err, RuleError::MalformedDocument { ref address, .. } if address == "loose.md");
}

#[test]
fn sibling_extensions_collide() {
    let tmp = tempfile::tempdir().unwrap();
    write_rule(tmp.path(), "a.md", "A", "*", "one");
    write_rule(tmp.path(), "a.mdc", "A", "*", "two");

    let err = RuleSet::load_dir(&DiscoveryConfig::new(tmp.path()), &CancellationToken::new())
        .unwrap_err();
    assert_eq!(err.kind(), "DuplicateIdError");
}

#[test]
fn bad_glob_in_file_aborts() {
    let tmp = tempfile::tempdir().unwrap();
    write_rule(tmp.path(), "bad.mdc", "Bad", "src/[oops", "body");

    let err = RuleSet::load_dir(&DiscoveryConfig::new(tmp.path()), &CancellationToken::new())
        .unwrap_err();
    assert_eq!(err.kind(), "PatternSyntaxError");
}

#[test]
fn reload_from_disk_picks_up_changes() {
    let tmp = tempfile::tempdir().unwrap();
    write_rule(tmp.path(), "a.mdc", "A", "**/*", "first");
    let config = DiscoveryConfig::new(tmp.path());
    let cancel = CancellationToken::new();

    let active = ActiveRuleSet::new(RuleSet::load_dir(&config, &cancel).unwrap());
    write_rule(tmp.path(), "a.mdc", "A", "**/*", "second");
    active.reload_dir(&config, &cancel).unwrap();
    assert_eq!(
        active.compose("x", &ComposeOptions::default()).unwrap().render(),
        "second"
    );

    // Broken edit leaves the last good snapshot in place
    write_rule(tmp.path(), "b.mdc", "B", "{unclosed", "oops");
    assert!(active.reload_dir(&config, &cancel).is_err());
    assert_eq!(
        active.compose("x", &ComposeOptions::default()).unwrap().render(),
        "second"
    );
}
