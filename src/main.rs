fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if let Err(e) = chordscope_lib::run(args) {
        eprintln!("chordscope: {:#}", e);
        std::process::exit(1);
    }
}
