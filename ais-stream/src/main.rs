use ais_stream::{settings::Settings, startup::App, telemetry::init_tracer};
use tracing::error;

#[tokio::main]
async fn main() {
    let settings = Settings::new().unwrap();
    init_tracer(settings.log_level);

    let app = App::build(&settings).await.unwrap();

    app.run(shutdown_signal()).await;
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {e:?}");
        std::future::pending::<()>().await;
    }
}
