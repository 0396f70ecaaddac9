use env_logger::{Builder, Env, Target};

fn main() -> anyhow::Result<()> {
    Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stderr)
        .init();
    xlsx_qa::cli::run()
}
