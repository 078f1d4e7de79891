use crate::App;

/// Print live pastes to stdout, newest first or largest first.
pub async fn run(mut app: App, top: bool, count: usize) -> anyhow::Result<()> {
    let pastes = if top {
        app.pastes.list_top(count).await?
    } else {
        app.pastes.list_recent(count).await?
    };

    for paste in pastes {
        println!("{}\t{}", paste.id, paste.title);
    }

    app.pastes.close().await?;
    Ok(())
}
