//! Build automation tasks for the cpp_dbc workspace.
//!
//! Run with `cargo xtask <command>`.
//!
//! ## Available Commands
//!
//! - `ci`: Run all CI checks (format, lint, test, deny)
//! - `fmt`: Check/apply code formatting
//! - `clippy`: Run clippy lints
//! - `test`: Run all tests
//! - `deny`: Run cargo-deny checks
//! - `doc`: Generate documentation
//! - `clean`: Clean build artifacts
//! - `dist`: Build release artifacts for distribution

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use xshell::{Shell, cmd};

#[derive(Parser)]
#[command(name = "xtask", about = "Build automation for cpp_dbc")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all checks (format, lint, test, deny)
    Ci,
    /// Run cargo fmt (--check by default, --fix to apply)
    Fmt {
        /// Apply formatting fixes
        #[arg(long)]
        fix: bool,
    },
    /// Run clippy with all features
    Clippy {
        /// Apply clippy suggestions
        #[arg(long)]
        fix: bool,
    },
    /// Run all tests
    Test {
        /// Test a specific package
        #[arg(short, long)]
        package: Option<String>,
    },
    /// Run cargo-deny checks
    Deny,
    /// Generate documentation
    Doc {
        /// Open documentation in browser
        #[arg(long)]
        open: bool,
    },
    /// Clean build artifacts
    Clean,
    /// Build release artifacts for distribution
    Dist {
        /// Skip running tests before building
        #[arg(long)]
        no_test: bool,
    },
    /// Check for semver violations (requires cargo-semver-checks)
    Semver,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;

    let workspace_root = workspace_root()?;
    sh.change_dir(&workspace_root);

    match cli.command {
        Command::Ci => {
            println!("Running CI checks...");
            fmt(&sh, false)?;
            clippy(&sh, false)?;
            test(&sh, None)?;
            deny(&sh)?;
            println!("\n✅ All CI checks passed!");
        }
        Command::Fmt { fix } => fmt(&sh, fix)?,
        Command::Clippy { fix } => clippy(&sh, fix)?,
        Command::Test { package } => test(&sh, package.as_deref())?,
        Command::Deny => deny(&sh)?,
        Command::Doc { open } => doc(&sh, open)?,
        Command::Clean => clean(&sh)?,
        Command::Dist { no_test } => dist(&sh, no_test)?,
        Command::Semver => semver(&sh)?,
    }

    Ok(())
}

fn workspace_root() -> Result<PathBuf> {
    let output = std::process::Command::new("cargo")
        .args(["locate-project", "--workspace", "--message-format=plain"])
        .output()
        .context("failed to run cargo locate-project")?;

    let path = String::from_utf8(output.stdout)
        .context("invalid UTF-8 in cargo output")?
        .trim()
        .to_string();

    Ok(PathBuf::from(path)
        .parent()
        .context("failed to get workspace root")?
        .to_path_buf())
}

fn fmt(sh: &Shell, fix: bool) -> Result<()> {
    if fix {
        println!("Applying formatting...");
        cmd!(sh, "cargo fmt --all").run()?;
        println!("✅ Formatting applied.");
    } else {
        println!("Checking formatting...");
        cmd!(sh, "cargo fmt --all -- --check").run()?;
        println!("✅ Formatting check passed.");
    }
    Ok(())
}

fn clippy(sh: &Shell, fix: bool) -> Result<()> {
    if fix {
        println!("Applying clippy suggestions...");
        cmd!(
            sh,
            "cargo clippy --all-features --all-targets --fix --allow-dirty"
        )
        .run()?;
        println!("✅ Clippy suggestions applied.");
    } else {
        println!("Running clippy...");
        cmd!(
            sh,
            "cargo clippy --all-features --all-targets -- -D warnings"
        )
        .run()?;
        println!("✅ Clippy check passed.");
    }
    Ok(())
}

fn test(sh: &Shell, package: Option<&str>) -> Result<()> {
    println!("Running tests...");

    let mut args = vec!["test"];

    if let Some(pkg) = package {
        args.push("-p");
        args.push(pkg);
    }

    args.push("--all-features");

    let args_str = args.join(" ");
    cmd!(sh, "cargo {args_str}").run()?;
    println!("✅ All tests passed.");
    Ok(())
}

fn deny(sh: &Shell) -> Result<()> {
    println!("Running cargo-deny...");
    cmd!(sh, "cargo deny check").run()?;
    println!("✅ Cargo-deny check passed.");
    Ok(())
}

fn doc(sh: &Shell, open: bool) -> Result<()> {
    println!("Generating documentation...");
    if open {
        cmd!(sh, "cargo doc --all-features --no-deps --open").run()?;
    } else {
        cmd!(sh, "cargo doc --all-features --no-deps").run()?;
    }
    println!("✅ Documentation generated.");
    Ok(())
}

fn clean(sh: &Shell) -> Result<()> {
    println!("Cleaning build artifacts...");
    cmd!(sh, "cargo clean").run()?;
    println!("✅ Clean complete.");
    Ok(())
}

fn dist(sh: &Shell, no_test: bool) -> Result<()> {
    println!("Building release artifacts...");

    if !no_test {
        println!("Running tests before build...");
        test(sh, None)?;
    }

    println!("Building release binaries...");
    cmd!(sh, "cargo build --release").run()?;

    println!("Packaging crates...");
    let crates = [
        "cpp-dbc-types",
        "cpp-dbc-error",
        "cpp-dbc-driver",
        "cpp-dbc-registry",
        "cpp-dbc-pool",
        "cpp-dbc-txn",
        "cpp-dbc",
    ];

    for crate_name in &crates {
        cmd!(sh, "cargo package -p {crate_name} --allow-dirty").run()?;
    }

    println!("✅ Distribution artifacts built.");
    println!("   Release binaries: target/release/");
    println!("   Packages: target/package/");

    Ok(())
}

fn semver(sh: &Shell) -> Result<()> {
    println!("Checking for semver violations...");

    let crates = ["cpp-dbc-types", "cpp-dbc-pool", "cpp-dbc-txn", "cpp-dbc"];

    for crate_name in &crates {
        println!("  Checking {crate_name}...");
        cmd!(sh, "cargo semver-checks check-release -p {crate_name}").run()?;
    }

    println!("✅ No semver violations detected.");
    Ok(())
}
