use std::fs;

use assetpipe::types::TaskKind;
use assetpipe_test_utils::{init_tracing, ProjectFixture};

#[test]
fn scripts_are_minified_into_one_bundle_in_name_order() {
    init_tracing();
    let fx = ProjectFixture::new()
        .file("src/js/b.js", "var second = 2;\n")
        .file(
            "src/js/a.js",
            "function same(first, other) {\n    return first == other;\n}\n",
        );

    let report = fx.registry().run(TaskKind::Scripts).unwrap();

    assert_eq!(report.processed, 2);
    let bundle = fx.read("dist/js/ui.js");
    let a = bundle.find("function same").expect("a.js in bundle");
    let b = bundle.find("second").expect("b.js in bundle");
    assert!(a < b, "{bundle}");
    assert!(!bundle.contains("\n    return"));
    // Lint findings are advisory.
    assert!(fx.notifier.notifications().is_empty());
}

#[test]
fn statements_without_semicolons_stay_separate() {
    init_tracing();
    let fx = ProjectFixture::new()
        .file("src/js/a.js", "var app = 1\n")
        .file("src/js/b.js", "(function () { window.x = 2 })()\n")
        .file("src/js/c.js", "var a = 1\nvar b = 2\nvar c = a\n[1, 2].forEach(function (n) { b += n })\n");

    let report = fx.registry().run(TaskKind::Scripts).unwrap();

    assert_eq!(report.failed, 0, "{:?}", fx.notifier.notifications());
    let bundle = fx.read("dist/js/ui.js");
    let parts: Vec<&str> = bundle.split(";\n").collect();
    assert_eq!(parts.len(), 3, "{bundle}");
    assert!(parts[0].contains("app=1"), "{bundle}");
    assert!(parts[1].starts_with('('), "{bundle}");
    assert!(!parts[2].contains("1var") && !parts[2].contains("2var"), "{bundle}");
}

#[test]
fn unparsable_script_is_notified_and_left_out() {
    init_tracing();
    let fx = ProjectFixture::new()
        .file("src/js/a.js", "var ok = 1\n")
        .file("src/js/b.js", "var = ;\n");

    let report = fx.registry().run(TaskKind::Scripts).unwrap();

    assert_eq!((report.processed, report.failed), (1, 1));
    let notes = fx.notifier.notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].stage, "minify");
    assert_eq!(notes[0].file.as_deref(), Some("src/js/b.js"));
    assert!(fx.read("dist/js/ui.js").contains("ok=1"));
}

#[test]
fn editing_one_script_reminifies_only_that_script() {
    init_tracing();
    let fx = ProjectFixture::new()
        .file("src/js/a.js", "var first = 1;\n")
        .file("src/js/b.js", "var second = 2;\n")
        .file("src/js/c.js", "var third = 3;\n");
    let registry = fx.registry();
    registry.run(TaskKind::Scripts).unwrap();
    let before = fx.read("dist/js/ui.js");

    fx.write("src/js/b.js", "var second = 5;\n");
    let report = registry.run(TaskKind::Scripts).unwrap();

    assert_eq!((report.processed, report.skipped), (1, 2));
    let after = fx.read("dist/js/ui.js");
    let old: Vec<&str> = before.split(";\n").collect();
    let new: Vec<&str> = after.split(";\n").collect();
    assert_eq!(new.len(), 3, "{after}");
    assert_eq!((new[0], new[2]), (old[0], old[2]));
    assert!(new[1].contains("second=5"), "{after}");
}

#[test]
fn library_tree_is_copied_verbatim() {
    init_tracing();
    let bytes: Vec<u8> = (0u8..=255).collect();
    let fx = ProjectFixture::new().file("src/lib/jquery/jquery.min.js", "!function(){}();");
    fx.write("src/lib/fonts/icons.bin", &bytes);
    let registry = fx.registry();

    let report = registry.run(TaskKind::Library).unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(fx.read("dist/lib/jquery/jquery.min.js"), "!function(){}();");
    assert_eq!(fs::read(fx.path("dist/lib/fonts/icons.bin")).unwrap(), bytes);

    let again = registry.run(TaskKind::Library).unwrap();
    assert_eq!((again.processed, again.skipped), (0, 2));
}

#[test]
fn images_skip_the_sprite_subtree() {
    init_tracing();
    let fx = ProjectFixture::new()
        .png("src/img/logo.png", 4, 4, [1, 2, 3, 255])
        .png("src/img/sprite/icon.png", 4, 4, [9, 9, 9, 255])
        .file("src/img/notes.txt", "not an image");

    let report = fx.registry().run(TaskKind::Images).unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(
        fs::read(fx.path("dist/img/logo.png")).unwrap(),
        fs::read(fx.path("src/img/logo.png")).unwrap()
    );
    assert!(!fx.exists("dist/img/sprite/icon.png"));
    assert!(!fx.exists("dist/img/notes.txt"));
}

#[test]
fn copies_are_rewritten_when_the_output_disappears() {
    init_tracing();
    let fx = ProjectFixture::new().png("src/img/logo.png", 2, 2, [0, 0, 0, 255]);
    let registry = fx.registry();
    registry.run(TaskKind::Images).unwrap();

    fs::remove_file(fx.path("dist/img/logo.png")).unwrap();
    let report = registry.run(TaskKind::Images).unwrap();

    assert_eq!(report.processed, 1);
    assert!(fx.exists("dist/img/logo.png"));
}
