// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn volume_arg(help: &'static str) -> Arg {
    Arg::new("volume").long("volume").default_value("/").help(help)
}

fn build_cli() -> Command {
    Command::new("pkguninst")
        .version(env!("CARGO_PKG_VERSION"))
        .author("pkguninst Contributors")
        .about("Remove macOS packages and the files their receipts list")
        .subcommand_required(false)
        .arg(
            Arg::new("staging_dir")
                .long("staging-dir")
                .global(true)
                .value_name("PATH")
                .help("Staging directory for files being removed"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log progress (RUST_LOG overrides)"),
        )
        .subcommand(
            Command::new("list")
                .about("Show installed packages")
                .arg(volume_arg("Only show packages installed on this volume"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print JSON instead of text"),
                ),
        )
        .subcommand(
            Command::new("files")
                .about("Show the files and directories a package still owns")
                .arg(Arg::new("id").required(true).help("Package ID"))
                .arg(volume_arg("Volume the package is installed on"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print JSON instead of text"),
                ),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove files and directories installed by packages")
                .arg(volume_arg("Only remove packages from this volume"))
                .arg(
                    Arg::new("ids")
                        .long("id")
                        .num_args(1..)
                        .conflicts_with("regex")
                        .required_unless_present("regex")
                        .help("Operate on these package IDs"),
                )
                .arg(
                    Arg::new("regex")
                        .long("regex")
                        .help("Or operate on packages matching a regex expression"),
                )
                .arg(
                    Arg::new("force")
                        .short('f')
                        .long("force")
                        .action(ArgAction::SetTrue)
                        .help("Do not check if a package is provided by Apple"),
                )
                .arg(
                    Arg::new("quiet")
                        .short('q')
                        .long("quiet")
                        .action(ArgAction::SetTrue)
                        .help("Do not prompt for final user confirmation"),
                ),
        )
        .subcommand(
            Command::new("interactive")
                .about("Enter keyboard interactive mode (default)")
                .arg(
                    Arg::new("force")
                        .short('f')
                        .long("force")
                        .action(ArgAction::SetTrue)
                        .help("Allow removing Apple-provided packages"),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("pkguninst.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
