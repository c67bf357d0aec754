use std::process;

fn main() {
    if let Err(e) = spire::cli::run() {
        if let Some(clap_error) = e.downcast_ref::<clap::Error>() {
            clap_error.exit();
        }
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
