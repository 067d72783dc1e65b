fn main() -> anyhow::Result<()> {
    docsearch_indexer::run()
}
