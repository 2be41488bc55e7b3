#![allow(missing_docs)]

use clap::{Parser, Subcommand};

mod cmd;

#[derive(Parser)]
#[command(name = "rszkit", about = "RSZ container inspection and rewrite tools")]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	Info(cmd::info::Args),
	Classes(cmd::classes::Args),
	Tree(cmd::tree::Args),
	Roundtrip(cmd::roundtrip::Args),
	Rebuild(cmd::rebuild::Args),
}

fn main() {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> rszkit::rsz::Result<()> {
	let cli = Cli::parse();

	match cli.command {
		Commands::Info(args) => cmd::info::run(args),
		Commands::Classes(args) => cmd::classes::run(args),
		Commands::Tree(args) => cmd::tree::run(args),
		Commands::Roundtrip(args) => cmd::roundtrip::run(args),
		Commands::Rebuild(args) => cmd::rebuild::run(args),
	}
}
