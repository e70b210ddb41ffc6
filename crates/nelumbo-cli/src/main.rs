use std::process;

fn main() {
    if let Err(e) = nelumbo_cli::run_from(std::env::args_os()) {
        eprintln!("nelumbo: {e}");
        process::exit(if e.is_render_error() { 2 } else { 1 });
    }
}
