fn main() {
    std::process::exit(minepack_lib::run());
}
