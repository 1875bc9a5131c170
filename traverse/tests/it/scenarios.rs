//! End-to-end coverage of the six concrete scenarios and the cross-cutting
//! properties that exercise the public API as a whole, rather than one
//! module at a time.

use std::{
    io::Write,
    path::Path,
    sync::Mutex,
    time::Duration,
};

use assert_fs::prelude::*;
use pretty_assertions::assert_eq;
use redactyl_traverse::{
    traverse_archives, traverse_containers, traverse_iac, Limits, Stats, WorkspaceIgnore,
};

struct Collector(Mutex<Vec<(String, Vec<u8>)>>);

impl Collector {
    fn new() -> Self {
        Self(Mutex::new(Vec::new()))
    }

    fn into_sorted(self) -> Vec<(String, Vec<u8>)> {
        let mut emitted = self.0.into_inner().expect("lock");
        emitted.sort();
        emitted
    }
}

impl redactyl_traverse::Emit for Collector {
    fn emit(&self, virtual_path: &str, blob: &[u8]) {
        self.0
            .lock()
            .expect("lock")
            .push((virtual_path.to_string(), blob.to_vec()));
    }
}

fn make_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buf = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buf);
        let options = zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, data) in entries {
            writer.start_file(*name, options).expect("start file");
            writer.write_all(data).expect("write");
        }
        writer.finish().expect("finish");
    }
    buf.into_inner()
}

fn make_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_cksum();
        builder.append_data(&mut header, *name, *data).expect("append");
    }
    builder.into_inner().expect("into_inner")
}

fn make_container_tar(layers: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    let manifest = b"[{}]";
    let mut manifest_header = tar::Header::new_gnu();
    manifest_header.set_size(manifest.len() as u64);
    manifest_header.set_cksum();
    builder
        .append_data(&mut manifest_header, "manifest.json", &manifest[..])
        .expect("append manifest");
    for (layer_id, data) in layers {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{layer_id}/layer.tar"), &data[..])
            .expect("append layer");
    }
    builder.into_inner().expect("into_inner")
}

fn write(dir: &assert_fs::TempDir, relative: &str, contents: &[u8]) {
    dir.child(relative).write_binary(contents).expect("write fixture file");
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

/// Scenario 1: a zip with one text entry and one binary entry, unlimited
/// limits. Exactly the text entry is emitted and every guardrail stays at
/// zero.
#[test]
fn scenario_one_zip_skips_binary_entry() {
    init_tracing();
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let png_magic: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    write(&dir, "a.zip", &make_zip(&[("a.txt", b"hello"), ("b.png", &png_magic)]));

    let collector = Collector::new();
    let stats = Stats::default();
    let limits = Limits::default();
    let ignore = WorkspaceIgnore::accept_all();

    traverse_archives(dir.path(), &limits, &ignore, None, &collector, &stats).expect("traverse");

    assert_eq!(collector.into_sorted(), vec![("a.zip::a.txt".to_string(), b"hello".to_vec())]);
    assert_eq!(stats.aborted_by_bytes(), 0);
    assert_eq!(stats.aborted_by_entries(), 0);
    assert_eq!(stats.aborted_by_depth(), 0);
    assert_eq!(stats.aborted_by_time(), 0);
}

/// Scenario 2: a zip nested inside a tar nested inside a tar. At
/// `max_depth = 1` the innermost text entry surfaces; at `max_depth = 0`
/// nothing does, and the decline is recorded.
#[test]
fn scenario_two_nested_archive_depth_gate() {
    init_tracing();
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let inner_tar = make_tar(&[("s.txt", b"token=abc")]);
    let outer_zip = make_zip(&[("inner.tar", &inner_tar)]);
    write(&dir, "nested.zip", &outer_zip);

    let collector = Collector::new();
    let stats = Stats::default();
    let limits = Limits::builder().max_depth(Some(1)).build();
    let ignore = WorkspaceIgnore::accept_all();

    traverse_archives(dir.path(), &limits, &ignore, None, &collector, &stats).expect("traverse");
    assert_eq!(
        collector.into_sorted(),
        vec![("nested.zip::inner.tar::s.txt".to_string(), b"token=abc".to_vec())]
    );
    assert_eq!(stats.aborted_by_depth(), 0);

    let collector = Collector::new();
    let stats = Stats::default();
    let limits = Limits::builder().max_depth(Some(0)).build();
    traverse_archives(dir.path(), &limits, &ignore, None, &collector, &stats).expect("traverse");
    assert!(collector.into_sorted().is_empty());
    assert_eq!(stats.aborted_by_depth(), 1);
}

/// Scenario 3: a Docker-save container tarball. `traverse_containers` walks
/// each layer using `/` to join in-layer paths; `traverse_archives` ignores
/// the same file entirely, since a container tar is not an ordinary archive.
#[test]
fn scenario_three_container_layers_vs_archive_traversal() {
    init_tracing();
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let layer = make_tar(&[("etc/passwd", b"root:x:0:0")]);
    write(&dir, "image.tar", &make_container_tar(&[("sha256abc", layer)]));

    let collector = Collector::new();
    let stats = Stats::default();
    let limits = Limits::default();
    let ignore = WorkspaceIgnore::accept_all();

    traverse_containers(dir.path(), &limits, &ignore, None, &collector, &stats).expect("traverse");
    assert_eq!(
        collector.into_sorted(),
        vec![("image.tar::sha256abc/etc/passwd".to_string(), b"root:x:0:0".to_vec())]
    );

    let collector = Collector::new();
    traverse_archives(dir.path(), &limits, &ignore, None, &collector, &stats).expect("traverse");
    assert!(collector.into_sorted().is_empty());
}

/// Scenario 4: Terraform state with a nested plain-string secret and a
/// wrapped `{ "value": ... }` secret, both surfaced under their dotted
/// JSON paths.
#[test]
fn scenario_four_tfstate_sensitive_fields() {
    init_tracing();
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let json = br#"{"resources":[{"instances":[{"attributes":{"password":"p@ss","token":{"value":"t0k"}}}]}]}"#;
    write(&dir, "terraform.tfstate", json);

    let collector = Collector::new();
    let stats = Stats::default();
    let limits = Limits::default();
    let ignore = WorkspaceIgnore::accept_all();

    traverse_iac(dir.path(), &limits, &ignore, None, &collector, &stats).expect("traverse");

    assert_eq!(
        collector.into_sorted(),
        vec![
            (
                "terraform.tfstate::json:resources[0].instances[0].attributes.password".to_string(),
                b"resources[0].instances[0].attributes.password: p@ss".to_vec()
            ),
            (
                "terraform.tfstate::json:resources[0].instances[0].attributes.token.value".to_string(),
                b"resources[0].instances[0].attributes.token.value: t0k".to_vec()
            ),
        ]
    );
}

/// Scenario 5: a kubeconfig with one user token and one cluster CA,
/// surfaced under their dotted YAML paths.
#[test]
fn scenario_five_kubeconfig_sensitive_fields() {
    init_tracing();
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let yaml = r#"
apiVersion: v1
users:
  - name: dev
    user:
      token: eyJ...
clusters:
  - name: dev
    cluster:
      certificate-authority-data: Zm9v
"#;
    write(&dir, ".kube/config", yaml.as_bytes());

    let collector = Collector::new();
    let stats = Stats::default();
    let limits = Limits::default();
    let ignore = WorkspaceIgnore::accept_all();

    traverse_iac(dir.path(), &limits, &ignore, None, &collector, &stats).expect("traverse");

    assert_eq!(
        collector.into_sorted(),
        vec![
            (
                ".kube/config::yaml:clusters[0].cluster.certificate-authority-data".to_string(),
                b"Zm9v".to_vec()
            ),
            (".kube/config::yaml:users[0].user.token".to_string(), b"eyJ...".to_vec()),
        ]
    );
}

/// Scenario 6: a zip whose single entry decompresses far past a tight byte
/// budget. The budget trips before the entry is ever emitted, and the trip
/// is recorded; the whole traversal does not also run away.
#[test]
fn scenario_six_byte_budget_aborts_without_emission() {
    init_tracing();
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let huge = vec![b'x'; 1_000_000];
    write(&dir, "huge.zip", &make_zip(&[("huge.bin", &huge)]));

    let collector = Collector::new();
    let stats = Stats::default();
    let limits = Limits::builder().max_decompressed_bytes(100_000).build();
    let ignore = WorkspaceIgnore::accept_all();

    traverse_archives(dir.path(), &limits, &ignore, None, &collector, &stats).expect("traverse");

    assert!(collector.into_sorted().is_empty());
    assert!(stats.aborted_by_bytes() >= 1);
}

/// One artifact's guardrail trip does not affect another top-level
/// artifact processed in the same traversal: a tight entry budget that
/// aborts one zip still lets an unrelated zip emit in full.
#[test]
fn guardrail_trip_is_isolated_to_its_own_artifact() {
    init_tracing();
    let dir = assert_fs::TempDir::new().expect("tempdir");
    write(
        &dir,
        "many.zip",
        &make_zip(&[("a.txt", b"one"), ("b.txt", b"two"), ("c.txt", b"three")]),
    );
    write(&dir, "single.zip", &make_zip(&[("only.txt", b"lonely")]));

    let collector = Collector::new();
    let stats = Stats::default();
    let limits = Limits::builder().max_entries(1).build();
    let ignore = WorkspaceIgnore::accept_all();

    traverse_archives(dir.path(), &limits, &ignore, None, &collector, &stats).expect("traverse");

    let emitted = collector.into_sorted();
    assert_eq!(emitted.len(), 2);
    assert!(emitted.contains(&("single.zip::only.txt".to_string(), b"lonely".to_vec())));
    assert_eq!(stats.aborted_by_entries(), 1);
}

/// A workspace ignore file excludes matching paths from every traversal
/// kind, the same as the unit-level predicate tests assert for the loader
/// directly.
#[test]
fn ignore_file_excludes_matching_archives() {
    init_tracing();
    let dir = assert_fs::TempDir::new().expect("tempdir");
    write(&dir, "keep.zip", &make_zip(&[("a.txt", b"hello")]));
    write(&dir, "vendor/skip.zip", &make_zip(&[("b.txt", b"world")]));
    write(&dir, ".redactylignore", b"vendor/\n");

    let collector = Collector::new();
    let stats = Stats::default();
    let limits = Limits::default();
    let ignore = WorkspaceIgnore::load(dir.path()).expect("load ignore file");

    traverse_archives(dir.path(), &limits, &ignore, None, &collector, &stats).expect("traverse");

    assert_eq!(collector.into_sorted(), vec![("keep.zip::a.txt".to_string(), b"hello".to_vec())]);
}

/// Running the same traversal twice over the same workspace produces the
/// same set of emissions: nothing about the traversal is order- or
/// time-dependent absent an actual time budget.
#[test]
fn traversal_is_deterministic_across_runs() {
    init_tracing();
    let dir = assert_fs::TempDir::new().expect("tempdir");
    write(
        &dir,
        "repeat.zip",
        &make_zip(&[("a.txt", b"hello"), ("b.txt", b"world")]),
    );

    let limits = Limits::default();
    let ignore = WorkspaceIgnore::accept_all();

    let first = {
        let collector = Collector::new();
        let stats = Stats::default();
        traverse_archives(dir.path(), &limits, &ignore, None, &collector, &stats).expect("traverse");
        collector.into_sorted()
    };
    let second = {
        let collector = Collector::new();
        let stats = Stats::default();
        traverse_archives(dir.path(), &limits, &ignore, None, &collector, &stats).expect("traverse");
        collector.into_sorted()
    };

    assert_eq!(first, second);
}

/// A workspace with many archives, traversed across several worker threads,
/// still emits every entry exactly once; the sink has no internal locking
/// and must tolerate concurrent calls from any worker.
#[test]
fn worker_pool_emits_every_entry_exactly_once() {
    init_tracing();
    let dir = assert_fs::TempDir::new().expect("tempdir");
    for i in 0..20 {
        write(
            &dir,
            &format!("a{i}.zip"),
            &make_zip(&[(&format!("f{i}.txt"), format!("body-{i}").as_bytes())]),
        );
    }

    let collector = Collector::new();
    let stats = Stats::default();
    let limits = Limits::builder().workers(4).build();
    let ignore = WorkspaceIgnore::accept_all();

    traverse_archives(dir.path(), &limits, &ignore, None, &collector, &stats).expect("traverse");

    let emitted = collector.into_sorted();
    assert_eq!(emitted.len(), 20);
    for i in 0..20 {
        assert!(emitted.contains(&(
            format!("a{i}.zip::f{i}.txt"),
            format!("body-{i}").into_bytes()
        )));
    }
}

/// A nonexistent workspace root is rejected up front by every entry point,
/// not just `traverse_archives`.
#[test]
fn invalid_root_is_rejected_by_every_entry_point() {
    init_tracing();
    let missing = Path::new("/nonexistent/redactyl-test-root");
    let limits = Limits::default();
    let ignore = WorkspaceIgnore::accept_all();

    let archives = Collector::new();
    let archives_stats = Stats::default();
    assert!(traverse_archives(missing, &limits, &ignore, None, &archives, &archives_stats).is_err());

    let containers = Collector::new();
    let containers_stats = Stats::default();
    assert!(traverse_containers(missing, &limits, &ignore, None, &containers, &containers_stats).is_err());

    let iac = Collector::new();
    let iac_stats = Stats::default();
    assert!(traverse_iac(missing, &limits, &ignore, None, &iac, &iac_stats).is_err());
}

/// A zero time budget trips immediately: no entry from the artifact is
/// emitted and the time guardrail is recorded.
#[test]
fn expired_time_budget_aborts_before_first_entry() {
    init_tracing();
    let dir = assert_fs::TempDir::new().expect("tempdir");
    write(&dir, "slow.zip", &make_zip(&[("a.txt", b"hello")]));

    let collector = Collector::new();
    let stats = Stats::default();
    let limits = Limits::builder().time_budget(Duration::from_nanos(1)).build();
    let ignore = WorkspaceIgnore::accept_all();

    std::thread::sleep(Duration::from_millis(5));
    traverse_archives(dir.path(), &limits, &ignore, None, &collector, &stats).expect("traverse");

    assert!(collector.into_sorted().is_empty());
    assert_eq!(stats.aborted_by_time(), 1);
}
