fn main() -> miette::Result<()> {
    envspec::cli::main()
}
