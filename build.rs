use std::{
    env,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    process::Command,
};

fn main() {
    if let Err(why) = write_version_file() {
        panic!("failed to create the version file: {:?}", why);
    }
}

fn var(key: &str) -> io::Result<String> {
    env::var(key).map_err(|why| io::Error::new(io::ErrorKind::Other, format!("{}: {}", key, why)))
}

/// Writes `pipesh VERSION (TARGET)\nrev REVISION` as a raw string literal for `include!`.
fn write_version_file() -> io::Result<()> {
    let version = var("CARGO_PKG_VERSION")?;
    let target = var("TARGET")?;
    let out = PathBuf::from(var("OUT_DIR")?).join("version_string");
    let rev = git_rev().unwrap_or_else(|| "unknown".into());

    let mut file = File::create(&out)?;
    write!(&mut file, "r#\"pipesh {} ({})\nrev {}\"#", version, target, rev.trim())
}

fn git_rev() -> Option<String> {
    Command::new("git")
        .args(&["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .or_else(git_rev_from_file)
}

fn git_rev_from_file() -> Option<String> {
    let git = Path::new(&env::var("CARGO_MANIFEST_DIR").ok()?).join(".git");
    let head = fs::read_to_string(git.join("HEAD")).ok()?;
    match head.trim().strip_prefix("ref: ") {
        Some(reference) => fs::read_to_string(git.join(reference)).ok(),
        None => Some(head),
    }
}
