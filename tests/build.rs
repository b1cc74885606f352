//! End-to-end runs of the real task graph over a synthetic source tree.

use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use kiln::{Context, Sources, pipeline};

fn write(path: &Utf8Path, text: impl AsRef<[u8]>) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgba8(image::RgbaImage::new(width, height));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// A complete, lint-clean source tree exercising every task.
fn scaffold(sources: &Sources) {
    write(
        &sources.src.join("views/pages/index.html"),
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <title>Fixture</title>\n\
         @@include('../partials/head.html')\n\
         </head>\n\
         <body>\n\
         <h1 id=\"title\">Hello</h1>\n\
         <!-- build:js scripts/app.min.js -->\n\
         <script src=\"scripts/a.js\"></script>\n\
         <script src=\"scripts/b.js\"></script>\n\
         <!-- endbuild -->\n\
         </body>\n\
         </html>\n",
    );
    write(
        &sources.src.join("views/partials/head.html"),
        "<!-- build:css styles/main.min.css -->\n\
         <link rel=\"stylesheet\" href=\"styles/main.css\">\n\
         <!-- endbuild -->\n",
    );
    write(
        &sources.src.join("styles/main.scss"),
        "$accent: #336699;\nbody {\n  color: $accent;\n}\n",
    );
    write(&sources.src.join("scripts/a.js"), "// first\nvar alpha = 1;\n");
    write(&sources.src.join("scripts/b.js"), "var beta = 2;\n");
    write(&sources.src.join("images/dot.png"), png_bytes(16, 8));
    write(&sources.src.join("fonts/main.woff"), [7u8, 7, 7, 7]);
}

fn fixture() -> (tempfile::TempDir, Sources) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let sources = Sources::rooted(&root);
    scaffold(&sources);
    (temp, sources)
}

/// Every file in `dir`, keyed by path relative to it.
fn snapshot(dir: &Utf8Path) -> BTreeMap<String, Vec<u8>> {
    fn walk(dir: &Utf8Path, base: &Utf8Path, out: &mut BTreeMap<String, Vec<u8>>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = Utf8PathBuf::try_from(entry.unwrap().path()).unwrap();
            if path.is_dir() {
                walk(&path, base, out);
            } else {
                let rel = path.strip_prefix(base).unwrap().to_string();
                out.insert(rel, fs::read(&path).unwrap());
            }
        }
    }

    let mut out = BTreeMap::new();
    walk(dir, dir, &mut out);
    out
}

#[test]
fn full_build_produces_the_expected_tree() {
    let (_temp, sources) = fixture();
    let graph = pipeline::default_graph();
    let cx = Context::new(sources.clone());

    graph.run("build", &cx).unwrap();

    // Pages are expanded, rewritten and prettified.
    let html = fs::read_to_string(sources.dist.join("index.html")).unwrap();
    assert!(!html.contains("@@include"));
    assert_eq!(html.matches("<script").count(), 1);
    assert!(html.contains("<script src=\"scripts/app.min.js\"></script>"));
    assert!(html.contains("<link rel=\"stylesheet\" href=\"styles/main.min.css\">"));
    assert!(!html.contains("scripts/a.js"));

    // Bundles hold both inputs, minified.
    let js = fs::read_to_string(sources.dist.join("scripts/app.min.js")).unwrap();
    assert!(js.contains("alpha") && js.contains("beta"));
    assert!(!js.contains("// first"));

    let css = fs::read_to_string(sources.dist.join("styles/main.min.css")).unwrap();
    assert!(css.contains("#336699"));

    // Compiled CSS was staged in the temporary tree.
    assert!(sources.tmp.join("styles/main.css").is_file());

    // Images are optimized in place-structure, never growing.
    let original = fs::read(sources.src.join("images/dot.png")).unwrap();
    let optimized = fs::read(sources.dist.join("images/dot.png")).unwrap();
    assert!(optimized.len() <= original.len());
    let decoded = image::load_from_memory(&optimized).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (16, 8));

    // Fonts copy verbatim.
    let font = fs::read(sources.dist.join("fonts/main.woff")).unwrap();
    assert_eq!(font, [7, 7, 7, 7]);
}

#[test]
fn building_twice_is_deterministic() {
    let (_temp, sources) = fixture();
    let graph = pipeline::default_graph();
    let cx = Context::new(sources.clone());

    graph.run("build", &cx).unwrap();
    let first = snapshot(&sources.dist);

    graph.run("build", &cx).unwrap();
    let second = snapshot(&sources.dist);

    assert_eq!(first, second);
}

#[test]
fn lint_violations_fail_the_build_and_name_the_rule() {
    let (_temp, sources) = fixture();
    write(
        &sources.src.join("views/pages/broken.html"),
        "<!DOCTYPE html>\n<html lang=\"en\">\n<body>\n<div>\n</body>\n</html>\n",
    );

    let graph = pipeline::default_graph();
    let err = graph.run("build", &Context::new(sources)).unwrap_err();

    let report = err.to_string();
    assert!(report.contains("broken.html"));
    assert!(report.contains("tag-pair"));
}

#[test]
fn clean_removes_both_derived_trees() {
    let (_temp, sources) = fixture();
    let graph = pipeline::default_graph();
    let cx = Context::new(sources.clone());

    graph.run("build", &cx).unwrap();
    assert!(sources.dist.exists());
    assert!(sources.tmp.exists());

    graph.run("clean", &cx).unwrap();
    assert!(!sources.dist.exists());
    assert!(!sources.tmp.exists());
}

#[test]
fn individual_tasks_run_standalone() {
    let (_temp, sources) = fixture();
    let graph = pipeline::default_graph();
    let cx = Context::new(sources.clone());

    graph.run("fileinclude", &cx).unwrap();
    assert!(sources.src.join("index.html").is_file());

    graph.run("sass", &cx).unwrap();
    assert!(sources.tmp.join("styles/main.css").is_file());

    // `htmlhint` pulls `fileinclude` in as its declared prerequisite.
    graph.run("htmlhint", &cx).unwrap();
}
