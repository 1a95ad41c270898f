use riptide::session::SessionFacade;
use riptide::{Channel, ClientConfig, EventKind, StreamEvent};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "riptide=info".into()),
        )
        .init();

    #[cfg(feature = "env-file")]
    let config = ClientConfig::from_env_file()?;
    #[cfg(not(feature = "env-file"))]
    let config = ClientConfig::from_env()?;

    let session = SessionFacade::connect(&config).await?;
    let _pollers = session.spawn_pollers();

    println!("Fetching markets...");
    match session.refresh_markets().await {
        Ok(markets) => {
            println!("Found {} markets", markets.len());
            for market in markets.iter().take(5) {
                println!(
                    "Market: {} price={} change24h={}%",
                    market.symbol, market.price, market.change_24h
                );
            }
        }
        Err(e) => {
            println!("Error fetching markets: {}", e);
        }
    }

    if let Some(address) = session.address().await {
        println!("Wallet connected: {}", address);
        match session.refresh_account().await {
            Ok(account) => println!(
                "Balance: {} (available {})",
                account.balance, account.margin_available
            ),
            Err(e) => println!("Error fetching account: {}", e),
        }
    } else {
        println!("No wallet key configured; trading commands are disabled");
    }

    if let Some(stream) = session.stream() {
        let (_id, mut ticker_rx) = stream.listen(EventKind::Ticker);
        stream.subscribe(Channel::Ticker, Some("BTC-USD")).await?;
        stream.connect().await?;

        println!("Streaming BTC-USD ticks for 30 seconds...");
        let window = tokio::time::sleep(std::time::Duration::from_secs(30));
        tokio::pin!(window);
        loop {
            tokio::select! {
                () = &mut window => break,
                event = ticker_rx.recv() => match event {
                    Some(StreamEvent::Ticker(update)) => {
                        println!("{} @ {}", update.symbol, update.price);
                    }
                    Some(_) => {}
                    None => break,
                },
            }
        }
        stream.disconnect().await;
    }

    Ok(())
}
