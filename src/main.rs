fn main() {
    umiq_lib::run()
}
