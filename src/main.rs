//! Command-line front end over the plumbing library.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use git_plumb::objects::ObjectType;
use git_plumb::ops::{self, ListOptions};
use git_plumb::repository::{Repository, SetupOptions};
use git_plumb::store::ObjectStore;
use git_plumb::{Error, Result};

#[derive(Debug, Parser)]
#[command(name = "git-plumb", version, about = "Git plumbing over loose objects and the index")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create an empty repository or reinitialise an existing one
    Init {
        #[arg(short = 'b', long = "initial-branch", default_value = "main")]
        initial_branch: String,

        #[arg(long)]
        bare: bool,

        directory: Option<PathBuf>,
    },

    /// Compute object names and optionally write the objects
    HashObject {
        /// Object type to hash as
        #[arg(short = 't', default_value = "blob", value_name = "TYPE")]
        object_type: String,

        /// Write the object into the object database
        #[arg(short = 'w')]
        write: bool,

        /// Read the object from standard input
        #[arg(long)]
        stdin: bool,

        /// Hash the bytes as given, skipping format validation
        #[arg(long)]
        literally: bool,

        files: Vec<PathBuf>,
    },

    /// Show object type, size, existence or content
    CatFile {
        #[arg(short = 't', conflicts_with_all = ["show_size", "exists", "pretty"])]
        show_type: bool,

        #[arg(short = 's', conflicts_with_all = ["exists", "pretty"])]
        show_size: bool,

        /// Exit successfully iff the object exists and is well formed
        #[arg(short = 'e', conflicts_with = "pretty")]
        exists: bool,

        /// Pretty-print the object's content
        #[arg(short = 'p')]
        pretty: bool,

        #[arg(long)]
        allow_unknown_type: bool,

        /// Either `<type> <object>` or, with a mode flag, `<object>`
        #[arg(required = true)]
        args: Vec<String>,
    },

    /// List index and worktree files
    LsFiles {
        #[arg(short = 'c', long)]
        cached: bool,

        #[arg(short = 'o', long)]
        others: bool,

        #[arg(short = 'd', long)]
        deleted: bool,

        #[arg(short = 'm', long)]
        modified: bool,

        #[arg(short = 'u', long)]
        unmerged: bool,

        #[arg(short = 'k', long)]
        killed: bool,

        #[arg(short = 's', long = "stage")]
        stage: bool,

        /// Terminate output lines with NUL instead of newline
        #[arg(short = 'z')]
        nul_terminated: bool,
    },

    /// Print an object's raw encoded bytes
    Inflate { object: String },

    /// Print version information
    Version,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("fatal: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<ExitCode> {
    match command {
        Command::Init {
            initial_branch,
            bare,
            directory,
        } => init(directory, initial_branch, bare),
        Command::HashObject {
            object_type,
            write,
            stdin,
            literally,
            files,
        } => hash_object(&object_type, write, stdin, literally, files),
        Command::CatFile {
            show_type,
            show_size,
            exists,
            pretty,
            allow_unknown_type,
            args,
        } => cat_file(show_type, show_size, exists, pretty, allow_unknown_type, args),
        Command::LsFiles {
            cached,
            others,
            deleted,
            modified,
            unmerged,
            killed,
            stage,
            nul_terminated,
        } => ls_files(
            ListOptions {
                cached,
                others,
                deleted,
                modified,
                unmerged,
                killed,
                stage_info: stage,
            },
            nul_terminated,
        ),
        Command::Inflate { object } => inflate(&object),
        Command::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init(directory: Option<PathBuf>, initial_branch: String, bare: bool) -> Result<ExitCode> {
    let repo = Repository::setup(&SetupOptions {
        name: directory,
        initial_branch,
        bare,
    })?;
    println!(
        "Initialized empty repository in {}",
        repo.name()?.display()
    );
    Ok(ExitCode::SUCCESS)
}

fn hash_object(
    object_type: &str,
    write: bool,
    stdin: bool,
    literally: bool,
    files: Vec<PathBuf>,
) -> Result<ExitCode> {
    // Hashing without -w has no reason to require a repository.
    let store = match Repository::open(None) {
        Ok(repo) => repo.into_store(),
        Err(_) if !write => ObjectStore::new(PathBuf::from(".git").join("objects")),
        Err(err) => return Err(err),
    };
    let check_format = !literally;

    if stdin {
        let mut data = Vec::new();
        io::stdin().lock().read_to_end(&mut data)?;
        let name = ops::hash_object(&store, &data[..], object_type, check_format, write)?;
        println!("{name}");
    }
    for file in files {
        let reader = std::fs::File::open(&file)?;
        let name = ops::hash_object(&store, reader, object_type, check_format, write)?;
        println!("{name}");
    }
    Ok(ExitCode::SUCCESS)
}

fn cat_file(
    show_type: bool,
    show_size: bool,
    exists: bool,
    pretty: bool,
    allow_unknown_type: bool,
    args: Vec<String>,
) -> Result<ExitCode> {
    let repo = Repository::open(None)?;
    let store = repo.store();
    let mut stdout = io::stdout().lock();

    if show_type || show_size {
        let object = single_operand(&args)?;
        let (typ, size) = ops::read_type_and_size(store, object, allow_unknown_type)?;
        if show_type {
            writeln!(stdout, "{typ}")?;
        } else {
            writeln!(stdout, "{size}")?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    if exists {
        let object = single_operand(&args)?;
        return match ops::read_object(store, object, None) {
            Ok(_) => Ok(ExitCode::SUCCESS),
            Err(err) => {
                eprintln!("fatal: {err}");
                Ok(ExitCode::FAILURE)
            }
        };
    }

    if pretty {
        let object = single_operand(&args)?;
        let parsed = ops::read_object(store, object, None)?;
        stdout.write_all(&parsed.format())?;
        return Ok(ExitCode::SUCCESS);
    }

    // Plain form: `cat-file <type> <object>` prints the payload verbatim.
    if args.len() != 2 {
        return Err(Error::InvalidFormat);
    }
    let typ: ObjectType = args[0].parse()?;
    let parsed = ops::read_object(store, &args[1], Some(typ))?;
    stdout.write_all(&parsed.serialize())?;
    Ok(ExitCode::SUCCESS)
}

fn single_operand(args: &[String]) -> Result<&str> {
    match args {
        [object] => Ok(object.as_str()),
        _ => Err(Error::InvalidFormat),
    }
}

fn ls_files(options: ListOptions, nul_terminated: bool) -> Result<ExitCode> {
    let repo = Repository::open(None)?;
    let listing = ops::ls_files(&repo, options)?;

    let mut stdout = io::stdout().lock();
    let terminator: &[u8] = if nul_terminated { b"\0" } else { b"\n" };
    for file in listing {
        if let (Some(mode), Some(id), Some(stage)) = (file.mode, file.id, file.stage) {
            write!(stdout, "{:06o} {} {}\t", mode.bits(), id, stage.as_bits())?;
        }
        stdout.write_all(&file.path)?;
        stdout.write_all(terminator)?;
    }
    Ok(ExitCode::SUCCESS)
}

fn inflate(object: &str) -> Result<ExitCode> {
    let repo = Repository::open(None)?;
    let data = ops::read_encoded_data(repo.store(), object)?;
    io::stdout().lock().write_all(&data)?;
    Ok(ExitCode::SUCCESS)
}
