use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = scout_encoder::Args::parse();

	scout_encoder::run(args).await
}
