use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = vcat_worker::Args::parse();

	vcat_worker::run(args).await
}
