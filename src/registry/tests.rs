use super::*;
use crate::compiler::BrewCompiler;
use crate::container::ContainerState;
use crate::lang::Value;
use crate::watch::ChangeKind;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tempfile::TempDir;

fn script(name: &str, body: &str) -> String {
    format!("namespace Scripts;\nscript {name} {{ {body} }}")
}

struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        for sub in ["scripts/lib", "common"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        Self { dir }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn write(&self, rel: &str, text: &str) {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    fn settings(&self, watch: bool) -> RegistrySettings {
        RegistrySettings {
            common_root: Some(self.path("common")),
            library_root: self.path("scripts/lib"),
            compiled_root: self.path(".cache/scripts"),
            debounce: Duration::from_millis(30),
            watch,
            ..RegistrySettings::new(self.path("scripts"))
        }
    }

    fn registry(&self) -> ScriptRegistry {
        ScriptRegistry::new(self.settings(false), Arc::new(BrewCompiler)).unwrap()
    }

    fn watching_registry(&self) -> ScriptRegistry {
        ScriptRegistry::new(self.settings(true), Arc::new(BrewCompiler)).unwrap()
    }
}

/// Poll `cond` until it holds or `timeout` elapses.
fn wait_for(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    cond()
}

fn generation(container: &ScriptContainer) -> Option<u64> {
    container.status().generation
}

fn call(container: &ScriptContainer, method: &str) -> Value {
    container
        .get_new_instance()
        .unwrap()
        .call(method, &[])
        .unwrap()
}

fn changed(project: &Project, origin: WatchOrigin, rel: &str) -> WatchEvent {
    WatchEvent::new(origin, project.path(rel), ChangeKind::Modified)
}

// ============================================================================
// lookup
// ============================================================================

#[test]
fn test_get_is_idempotent() {
    let project = Project::new();
    project.write("scripts/Intro.brew", &script("Intro", "fn v() = 1;"));
    let registry = project.registry();

    let first = registry.get("Intro").unwrap();
    let second = registry.get("Intro").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.containers().unwrap().len(), 1);
    assert!(registry.contains("Intro"));
    assert_eq!(first.identity().type_name, "Scripts.Intro");
}

#[test]
fn test_concurrent_get_shares_one_container() {
    let project = Project::new();
    project.write("common/Shared.brew", &script("Shared", "fn v() = 7;"));
    project.write("scripts/Intro.brew", &script("Intro", "fn v() = 1;"));
    let registry = project.registry();

    let fetched: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = &registry;
                let name = if i % 2 == 0 { "Shared" } else { "Intro" };
                s.spawn(move || (name, registry.get(name).unwrap()))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for name in ["Shared", "Intro"] {
        let mut same = fetched.iter().filter(|(n, _)| *n == name).map(|(_, c)| c);
        let first = same.next().unwrap();
        assert!(same.all(|c| Arc::ptr_eq(first, c)));
        assert!(Arc::ptr_eq(first, &registry.get(name).unwrap()));
    }
    assert_eq!(registry.containers().unwrap().len(), 2);
    assert_eq!(call(&registry.get("Shared").unwrap(), "v"), Value::Int(7));
}

#[test]
fn test_get_missing_and_invalid() {
    let project = Project::new();
    let registry = project.registry();

    assert!(matches!(
        registry.get("Nope").unwrap_err(),
        RuntimeError::SourceNotFound { name } if name == "Nope"
    ));
    assert!(matches!(
        registry.get("../escape").unwrap_err(),
        RuntimeError::InvalidScriptName(_)
    ));
    assert!(!registry.contains("Nope"));
}

#[test]
fn test_list_script_names_with_override() {
    let project = Project::new();
    project.write("scripts/A.brew", "");
    project.write("scripts/B.brew", "");
    project.write("common/B.brew", "");
    project.write("common/C.brew", "");
    let registry = project.registry();

    let mut names = registry.list_script_names().unwrap();
    assert_eq!(names.last().map(String::as_str), Some("C"));
    names.sort();
    assert_eq!(names, vec!["A", "B", "C"]);
}

#[test]
fn test_common_script_is_copied_in() {
    let project = Project::new();
    let original = project.path("common/Shared.brew");
    project.write("common/Shared.brew", &script("Shared", "fn v() = 7;"));
    let mut perms = fs::metadata(&original).unwrap().permissions();
    perms.set_readonly(true);
    fs::set_permissions(&original, perms).unwrap();

    let registry = project.registry();
    let container = registry.get("Shared").unwrap();

    let local = project.path("scripts/Shared.brew");
    assert_eq!(container.identity().source_path, local);
    assert!(local.is_file());
    assert!(!fs::metadata(&local).unwrap().permissions().readonly());
    assert_eq!(call(&container, "v"), Value::Int(7));
}

#[test]
fn test_new_creates_directories() {
    let dir = TempDir::new().unwrap();
    let settings = RegistrySettings {
        watch: false,
        ..RegistrySettings::new(dir.path().join("fresh/scripts"))
    };
    let registry = ScriptRegistry::new(settings, Arc::new(BrewCompiler)).unwrap();

    let settings = registry.settings();
    assert!(settings.source_root.is_dir());
    assert!(settings.library_root.is_dir());
    assert!(settings.compiled_root.is_dir());
    assert!(registry.list_script_names().unwrap().is_empty());
}

// ============================================================================
// routing
// ============================================================================

#[test]
fn test_script_change_reloads_only_that_container() {
    let project = Project::new();
    project.write("scripts/A.brew", &script("A", "fn v() = 1;"));
    project.write("scripts/B.brew", &script("B", "fn v() = 1;"));
    let registry = project.registry();
    let a = registry.get("A").unwrap();
    let b = registry.get("B").unwrap();
    a.compile().unwrap();
    b.compile().unwrap();

    project.write("scripts/A.brew", &script("A", "fn v() = 2;"));
    registry
        .dispatch(changed(&project, WatchOrigin::Scripts, "scripts/A.brew"))
        .unwrap();

    assert!(wait_for(Duration::from_secs(2), || generation(&a) == Some(2)));
    assert_eq!(call(&a, "v"), Value::Int(2));
    thread::sleep(Duration::from_millis(100));
    assert_eq!(generation(&b), Some(1));
}

#[test]
fn test_change_for_unloaded_script_is_ignored() {
    let project = Project::new();
    project.write("scripts/A.brew", &script("A", "fn v() = 1;"));
    let registry = project.registry();

    registry
        .dispatch(changed(&project, WatchOrigin::Scripts, "scripts/A.brew"))
        .unwrap();
    thread::sleep(Duration::from_millis(150));
    assert!(!registry.contains("A"));
}

#[test]
fn test_library_change_reloads_every_container() {
    let project = Project::new();
    project.write("scripts/lib/util.brew", "fn base() = 1;");
    project.write("scripts/A.brew", &script("A", "fn v() = base();"));
    project.write("scripts/B.brew", &script("B", "fn v() = base() + 10;"));
    let registry = project.registry();
    let a = registry.get("A").unwrap();
    let b = registry.get("B").unwrap();
    assert_eq!(call(&a, "v"), Value::Int(1));
    assert_eq!(call(&b, "v"), Value::Int(11));

    project.write("scripts/lib/util.brew", "fn base() = 5;");
    registry
        .dispatch(changed(&project, WatchOrigin::Library, "scripts/lib/util.brew"))
        .unwrap();

    assert!(wait_for(Duration::from_secs(2), || {
        generation(&a) == Some(2) && generation(&b) == Some(2)
    }));
    assert_eq!(call(&a, "v"), Value::Int(5));
    assert_eq!(call(&b, "v"), Value::Int(15));
}

#[test]
fn test_burst_of_changes_reloads_once() {
    let project = Project::new();
    project.write("scripts/A.brew", &script("A", "fn v() = 1;"));
    let registry = project.registry();
    let a = registry.get("A").unwrap();
    a.compile().unwrap();

    for _ in 0..10 {
        registry
            .dispatch(changed(&project, WatchOrigin::Scripts, "scripts/A.brew"))
            .unwrap();
    }

    assert!(wait_for(Duration::from_secs(2), || generation(&a) == Some(2)));
    thread::sleep(Duration::from_millis(200));
    assert_eq!(generation(&a), Some(2));
}

#[test]
fn test_syntax_error_keeps_last_good_context() {
    let project = Project::new();
    project.write("scripts/A.brew", &script("A", "fn v() = 1;"));
    let registry = project.registry();
    let a = registry.get("A").unwrap();
    assert_eq!(call(&a, "v"), Value::Int(1));

    project.write("scripts/A.brew", &script("A", "fn v() = ;"));
    registry
        .dispatch(changed(&project, WatchOrigin::Scripts, "scripts/A.brew"))
        .unwrap();

    assert!(wait_for(Duration::from_secs(2), || {
        a.state() == ContainerState::Faulted
    }));
    assert_eq!(call(&a, "v"), Value::Int(1));
    assert_eq!(generation(&a), Some(1));

    project.write("scripts/A.brew", &script("A", "fn v() = 3;"));
    registry
        .dispatch(changed(&project, WatchOrigin::Scripts, "scripts/A.brew"))
        .unwrap();
    assert!(wait_for(Duration::from_secs(2), || generation(&a) == Some(2)));
    assert_eq!(call(&a, "v"), Value::Int(3));
}

// ============================================================================
// disposal
// ============================================================================

#[test]
fn test_dispose_fails_everything() {
    let project = Project::new();
    project.write("scripts/A.brew", &script("A", "fn v() = 1;"));
    let registry = project.registry();
    let a = registry.get("A").unwrap();
    a.compile().unwrap();

    registry.dispose();
    registry.dispose();

    assert!(registry.is_disposed());
    assert!(registry.get("A").unwrap_err().is_disposed());
    assert!(registry.list_script_names().unwrap_err().is_disposed());
    assert!(registry.containers().unwrap_err().is_disposed());
    assert!(
        registry
            .dispatch(changed(&project, WatchOrigin::Scripts, "scripts/A.brew"))
            .unwrap_err()
            .is_disposed()
    );
    assert!(!registry.contains("A"));

    assert!(a.is_disposed());
    assert!(a.get_new_instance().unwrap_err().is_disposed());
}

#[test]
fn test_dispose_cancels_pending_reloads() {
    use crate::compiler::CompileRequest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let project = Project::new();
    project.write("scripts/A.brew", &script("A", "fn v() = 1;"));
    let calls = Arc::new(AtomicUsize::new(0));
    let counting = {
        let calls = Arc::clone(&calls);
        move |req: &CompileRequest<'_>| {
            calls.fetch_add(1, Ordering::SeqCst);
            BrewCompiler.compile(req)
        }
    };
    let settings = RegistrySettings {
        debounce: Duration::from_millis(200),
        ..project.settings(false)
    };
    let registry = ScriptRegistry::new(settings, Arc::new(counting)).unwrap();
    registry.get("A").unwrap().compile().unwrap();

    registry
        .dispatch(changed(&project, WatchOrigin::Scripts, "scripts/A.brew"))
        .unwrap();
    registry.dispose();

    thread::sleep(Duration::from_millis(400));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// end to end (real filesystem watchers)
// ============================================================================

fn touch_until(path: &Path, text: &str, timeout: Duration, cond: impl Fn() -> bool) -> bool {
    // Some backends deliver the first event late; rewrite until it lands
    let start = Instant::now();
    while start.elapsed() < timeout {
        fs::write(path, text).unwrap();
        if wait_for(Duration::from_millis(500), &cond) {
            return true;
        }
    }
    cond()
}

#[test]
fn test_hot_reload_project_script() {
    let project = Project::new();
    project.write("scripts/Intro.brew", &script("Intro", "fn v() = 1;"));
    let registry = project.watching_registry();
    assert!(registry.is_watching());

    let intro = registry.get("Intro").unwrap();
    let old = intro.get_new_instance().unwrap();
    assert_eq!(old.call("v", &[]).unwrap(), Value::Int(1));

    let reloaded = touch_until(
        &project.path("scripts/Intro.brew"),
        &script("Intro", "fn v() = 2;"),
        Duration::from_secs(5),
        || generation(&intro).is_some_and(|g| g >= 2),
    );
    assert!(reloaded);
    assert_eq!(call(&intro, "v"), Value::Int(2));
    // the instance made before the reload still runs its own generation
    assert_eq!(old.call("v", &[]).unwrap(), Value::Int(1));
}

#[test]
fn test_hot_reload_library_file() {
    let project = Project::new();
    project.write("scripts/lib/nested/util.brew", "fn base() = 1;");
    project.write("scripts/A.brew", &script("A", "fn v() = base();"));
    let registry = project.watching_registry();
    let a = registry.get("A").unwrap();
    assert_eq!(call(&a, "v"), Value::Int(1));

    let reloaded = touch_until(
        &project.path("scripts/lib/nested/util.brew"),
        "fn base() = 9;",
        Duration::from_secs(5),
        || generation(&a).is_some_and(|g| g >= 2),
    );
    assert!(reloaded);
    assert_eq!(call(&a, "v"), Value::Int(9));
}

#[test]
fn test_no_events_after_dispose() {
    let project = Project::new();
    project.write("scripts/A.brew", &script("A", "fn v() = 1;"));
    let registry = project.watching_registry();
    let a = registry.get("A").unwrap();
    a.compile().unwrap();

    registry.dispose();
    assert!(!registry.is_watching());

    project.write("scripts/A.brew", &script("A", "fn v() = 2;"));
    thread::sleep(Duration::from_millis(300));
    assert_eq!(a.state(), ContainerState::Disposed);
}
