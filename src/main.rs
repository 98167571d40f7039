fn main() {
    qread_lib::run()
}
