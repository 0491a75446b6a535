use clap::Parser;
use std::fs;
use std::io::stdout;
use std::process::ExitCode;
use wasmite::driver;
use wasmite::logging;
use wasmite::module::Module;

#[derive(Parser)]
#[command(name = "wasmite")]
#[command(about = "WebAssembly MVP bytecode interpreter")]
struct Cli {
    /// Path to the module description file
    file: String,

    /// Print a module summary instead of running it
    #[arg(long)]
    dump: bool,

    /// Textual arguments for the module's main function
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    let text = match fs::read_to_string(&cli.file) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error reading {}: {}", cli.file, e);
            return ExitCode::FAILURE;
        }
    };

    let module: Module = match serde_json::from_str(&text) {
        Ok(module) => module,
        Err(e) => {
            eprintln!("Error parsing {}: {}", cli.file, e);
            return ExitCode::FAILURE;
        }
    };

    if cli.dump {
        print!("{module}");
        return ExitCode::SUCCESS;
    }

    match driver::run(&module, &cli.args, &mut stdout()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
