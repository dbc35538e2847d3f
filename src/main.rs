fn main() {
    triad::projects::cli::start_cli();
}
