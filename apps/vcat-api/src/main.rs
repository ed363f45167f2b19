use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = vcat_api::Args::parse();

	vcat_api::run(args).await
}
