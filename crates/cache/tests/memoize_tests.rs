//! End-to-end memoization against real child processes
#![cfg(unix)]

use memoexec_cache::{
    CacheConfig, CacheOutcome, ExecuteOptions, Fingerprint, MemoizationCache,
};
use memoexec_core::{ExecutionResult, Invocation, Verbosity};
use memoexec_task::{CountingExecutor, SystemCommandExecutor};
use std::fs;
use tempfile::TempDir;

type Cache = MemoizationCache<CountingExecutor<SystemCommandExecutor>>;

fn new_cache(cache_dir: &TempDir) -> Cache {
    MemoizationCache::new(
        CountingExecutor::new(SystemCommandExecutor::new()),
        CacheConfig::new(cache_dir.path()),
    )
}

#[test]
fn echo_hello_is_spawned_once() {
    let cache_dir = TempDir::new().unwrap();
    let cache = new_cache(&cache_dir);
    let invocation = Invocation::builder("echo")
        .arg("hello")
        .verbosity(Verbosity::Silent)
        .build();

    let first = cache.execute(&invocation, &ExecuteOptions::new()).unwrap();
    let second = cache.execute(&invocation, &ExecuteOptions::new()).unwrap();

    assert_eq!(first, ExecutionResult::new(0, "hello\n", ""));
    assert_eq!(first, second);
    assert_eq!(cache.executor().spawn_count(), 1);
}

#[test]
fn entry_lands_under_digest_directory() {
    let cache_dir = TempDir::new().unwrap();
    let cache = new_cache(&cache_dir);
    let invocation = Invocation::builder("echo")
        .arg("layout")
        .verbosity(Verbosity::Silent)
        .build();
    let options = ExecuteOptions::new();

    cache.execute(&invocation, &options).unwrap();

    let (fingerprint, _) = Fingerprint::compute(&invocation, &options).unwrap();
    let entry_dir = cache_dir.path().join(fingerprint.digest());
    assert!(entry_dir.join("result.json").is_file());
    assert!(entry_dir.join("manifest.json").is_file());
}

#[test]
fn forced_run_spawns_again_and_replaces_entry() {
    let cache_dir = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let counter = work.path().join("runs");
    let cache = new_cache(&cache_dir);

    // Output changes on every real run, so a hit is recognisable
    let invocation = Invocation::builder("sh")
        .args(["-c", "echo x >> runs; wc -l < runs"])
        .working_dir(work.path())
        .verbosity(Verbosity::Silent)
        .build();
    // The counter file is rewritten by the command itself
    let options = ExecuteOptions::new().ignore(&counter);

    let first = cache.execute(&invocation, &options).unwrap();
    let forced = cache
        .execute_with_outcome(&invocation, &options.clone().force(true))
        .unwrap();
    let after = cache.execute_with_outcome(&invocation, &options).unwrap();

    assert_eq!(first.stdout.trim(), "1");
    assert_eq!(forced.1, CacheOutcome::Forced);
    assert_eq!(forced.0.stdout.trim(), "2");
    assert_eq!(after.1, CacheOutcome::Hit);
    assert_eq!(after.0, forced.0);
    assert_eq!(cache.executor().spawn_count(), 2);
}

#[test]
fn mutated_input_file_triggers_reexecution() {
    let cache_dir = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let recipe = work.path().join("meta.yaml");
    fs::write(&recipe, "version: 1\n").unwrap();

    let cache = new_cache(&cache_dir);
    let invocation = Invocation::builder("cat")
        .arg("meta.yaml")
        .working_dir(work.path())
        .verbosity(Verbosity::Silent)
        .build();
    let options = ExecuteOptions::new();

    assert_eq!(cache.execute(&invocation, &options).unwrap().stdout, "version: 1\n");
    assert_eq!(cache.execute(&invocation, &options).unwrap().stdout, "version: 1\n");
    assert_eq!(cache.executor().spawn_count(), 1);

    fs::write(&recipe, "version: 2\n").unwrap();
    assert_eq!(cache.execute(&invocation, &options).unwrap().stdout, "version: 2\n");
    assert_eq!(cache.executor().spawn_count(), 2);
}

#[test]
fn mutated_file_in_directory_argument_triggers_reexecution() {
    let cache_dir = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let recipe_dir = work.path().join("recipe");
    fs::create_dir_all(recipe_dir.join("patches")).unwrap();
    fs::write(recipe_dir.join("patches/fix.patch"), "- old\n").unwrap();

    let cache = new_cache(&cache_dir);
    let invocation = Invocation::builder("ls")
        .arg("recipe")
        .working_dir(work.path())
        .verbosity(Verbosity::Silent)
        .build();
    let options = ExecuteOptions::new();

    cache.execute(&invocation, &options).unwrap();
    cache.execute(&invocation, &options).unwrap();
    assert_eq!(cache.executor().spawn_count(), 1);

    fs::write(recipe_dir.join("patches/fix.patch"), "+ new\n").unwrap();
    cache.execute(&invocation, &options).unwrap();
    assert_eq!(cache.executor().spawn_count(), 2);
}

#[test]
fn identical_trees_in_different_directories_both_execute() {
    let cache_dir = TempDir::new().unwrap();
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    for work in [&first, &second] {
        fs::create_dir_all(work.path().join("pkg")).unwrap();
        fs::write(work.path().join("pkg/meta.yaml"), "name: demo\n").unwrap();
    }

    let cache = new_cache(&cache_dir);
    let build_in = |work: &TempDir| {
        Invocation::builder("sh")
            .args(["-c", "pwd; touch \"$0\"/built", "pkg"])
            .working_dir(work.path())
            .verbosity(Verbosity::Silent)
            .build()
    };
    // The marker written by the command is not an input
    let options = |work: &TempDir| ExecuteOptions::new().ignore(work.path().join("pkg/built"));

    let in_first = cache.execute(&build_in(&first), &options(&first)).unwrap();
    let in_second = cache.execute(&build_in(&second), &options(&second)).unwrap();

    assert_eq!(cache.executor().spawn_count(), 2);
    assert_ne!(in_first.stdout, in_second.stdout);
    assert!(first.path().join("pkg/built").is_file());
    assert!(second.path().join("pkg/built").is_file());
}

#[test]
fn failed_command_is_returned_but_not_stored() {
    let cache_dir = TempDir::new().unwrap();
    let cache = new_cache(&cache_dir);
    let invocation = Invocation::builder("sh")
        .args(["-c", "echo nope >&2; exit 2"])
        .verbosity(Verbosity::Silent)
        .build();

    let result = cache.execute(&invocation, &ExecuteOptions::new()).unwrap();
    assert_eq!(result.exit_code, 2);
    assert_eq!(result.stderr, "nope\n");

    cache.execute(&invocation, &ExecuteOptions::new()).unwrap();
    assert_eq!(cache.executor().spawn_count(), 2);
}

#[test]
fn spawn_failure_is_an_error_and_not_stored() {
    let cache_dir = TempDir::new().unwrap();
    let cache = new_cache(&cache_dir);
    let invocation = Invocation::builder("memoexec-no-such-tool")
        .verbosity(Verbosity::Silent)
        .build();

    let err = cache.execute(&invocation, &ExecuteOptions::new()).unwrap_err();
    assert!(err.is_spawn_failure());
    assert_eq!(fs::read_dir(cache_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn memoized_execute_works_inside_running_runtime() {
    let cache_dir = TempDir::new().unwrap();
    let cache = new_cache(&cache_dir);
    let invocation = Invocation::builder("echo")
        .arg("nested")
        .verbosity(Verbosity::Silent)
        .build();

    let first = cache.execute(&invocation, &ExecuteOptions::new()).unwrap();
    let second = cache.execute(&invocation, &ExecuteOptions::new()).unwrap();
    assert_eq!(first.stdout, "nested\n");
    assert_eq!(first, second);
    assert_eq!(cache.executor().spawn_count(), 1);
}
