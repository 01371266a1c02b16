use assetpipe::types::TaskKind;
use assetpipe_test_utils::{init_tracing, ProjectFixture};

#[test]
fn includes_are_inlined_into_pages() {
    init_tracing();
    let fx = ProjectFixture::new()
        .file("src/html/a.html", "<body>@@include('b.html')</body>")
        .file("src/html/b.html", "<p>hi</p>");

    let report = fx.registry().run(TaskKind::Markup).unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(fx.read("dist/html/a.html"), "<body><p>hi</p></body>");
    assert_eq!(fx.read("dist/html/b.html"), "<p>hi</p>");
    assert!(fx.notifier.notifications().is_empty());
}

#[test]
fn unchanged_pages_are_skipped_and_included_changes_propagate() {
    init_tracing();
    let fx = ProjectFixture::new()
        .file("src/html/a.html", "<body>@@include('parts/nav.html')</body>")
        .file("src/html/parts/nav.html", "<nav>v1</nav>");
    let registry = fx.registry();

    let first = registry.run(TaskKind::Markup).unwrap();
    assert_eq!(first.processed, 1);

    let second = registry.run(TaskKind::Markup).unwrap();
    assert_eq!((second.processed, second.skipped), (0, 1));

    fx.write("src/html/parts/nav.html", "<nav>v2</nav>");
    let third = registry.run(TaskKind::Markup).unwrap();
    assert_eq!(third.processed, 1);
    assert_eq!(fx.read("dist/html/a.html"), "<body><nav>v2</nav></body>");
}

#[test]
fn missing_include_fails_only_that_page() {
    init_tracing();
    let fx = ProjectFixture::new()
        .file("src/html/broken.html", "@@include('gone.html')")
        .file("src/html/ok.html", "<p>ok</p>");

    let report = fx.registry().run(TaskKind::Markup).unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.processed, 1);
    assert!(fx.exists("dist/html/ok.html"));
    assert!(!fx.exists("dist/html/broken.html"));

    let notes = fx.notifier.notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].task, TaskKind::Markup);
    assert_eq!(notes[0].stage, "include");
    assert_eq!(notes[0].file.as_deref(), Some("src/html/broken.html"));
    assert!(notes[0].message.contains("gone.html"));
}

#[test]
fn circular_includes_are_reported_not_expanded() {
    init_tracing();
    let fx = ProjectFixture::new()
        .file("src/html/a.html", "A @@include('b.html')")
        .file("src/html/b.html", "B @@include('a.html')");

    let report = fx.registry().run(TaskKind::Markup).unwrap();

    assert_eq!(report.failed, 2);
    assert!(!fx.exists("dist/html/a.html"));
    let notes = fx.notifier.notifications();
    assert_eq!(notes.len(), 2);
    assert!(notes.iter().all(|n| n.message.contains("circular inclusion")));
}

#[test]
fn deleted_page_is_forgotten() {
    init_tracing();
    let fx = ProjectFixture::new().file("src/html/a.html", "<p>a</p>");
    let registry = fx.registry();
    registry.run(TaskKind::Markup).unwrap();

    std::fs::remove_file(fx.path("src/html/a.html")).unwrap();
    let report = registry.run(TaskKind::Markup).unwrap();
    assert_eq!(report, Default::default());

    fx.write("src/html/a.html", "<p>a</p>");
    std::fs::remove_file(fx.path("dist/html/a.html")).unwrap();
    let report = registry.run(TaskKind::Markup).unwrap();
    assert_eq!(report.processed, 1);
    assert!(fx.exists("dist/html/a.html"));
}

#[test]
fn include_parameters_reach_the_included_file() {
    init_tracing();
    let fx = ProjectFixture::new()
        .file(
            "src/html/index.html",
            "<head>@@include('parts/title.html', {\"title\": \"Home\"})</head>",
        )
        .file("src/html/broken.html", "@@include('parts/title.html', {title: Home})")
        .file("src/html/parts/title.html", "<title>@@title</title>");

    let report = fx.registry().run(TaskKind::Markup).unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(fx.read("dist/html/index.html"), "<head><title>Home</title></head>");
    assert!(!fx.exists("dist/html/broken.html"));
    let notes = fx.notifier.notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].stage, "include");
    assert_eq!(notes[0].file.as_deref(), Some("src/html/broken.html"));
}
