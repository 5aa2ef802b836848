use std::io;
use std::thread;

use lisp15::{
    options::{Options, USAGE},
    repl::{run_batch, run_repl},
    Interpreter,
};
use termcolor::StandardStream;

fn main() {
    env_logger::init();

    let opts = match Options::parse() {
        Ok(opts) => opts,
        Err(err) => {
            eprintln!("error: {}", err);
            eprintln!("{}", USAGE);
            std::process::exit(1);
        }
    };
    if opts.help {
        println!("{}", USAGE);
        return;
    }

    let stack_size = opts.stack_size_bytes();
    let result = thread::Builder::new()
        .name("lisp15-worker".to_string())
        .stack_size(stack_size)
        .spawn(move || run(&opts))
        .map_err(|e| format!("failed to start worker thread: {e}"))
        .and_then(|h| h.join().map_err(|_| "worker thread panicked".to_string())?);

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(opts: &Options) -> Result<(), String> {
    let interp = Interpreter::new().with_max_depth(opts.max_depth);
    let mut out = StandardStream::stdout(opts.color.choice());

    let outcome = match &opts.file {
        Some(file) => {
            log::info!("running {} (depth limit {})", file.display(), opts.max_depth);
            let src = std::fs::read_to_string(file)
                .map_err(|e| format!("cannot read {}: {e}", file.display()))?;
            run_batch(&interp, &src, &mut out)
        }
        None => {
            log::info!("starting interactive session (depth limit {})", opts.max_depth);
            run_repl(&interp, io::stdin().lock(), &mut out)
        }
    };

    outcome.map(|outcome| log::info!("session ended: {:?}", outcome)).map_err(|e| e.to_string())
}
