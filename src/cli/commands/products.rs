use std::sync::Arc;

use clap::Subcommand;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::cli::{gateway, utils, OutputFormat};
use crate::database::models::{Product, ProductPage};
use crate::panel::forms::{ProductFormFlow, SubmitOutcome};
use crate::panel::gateway::{HttpGateway, ListRequest, ProductGateway};
use crate::panel::listing::{Action, FetchKey, ListController, ListEvent, ReadyView, ViewState};
use crate::panel::query::{self, ListQuery};
use crate::panel::session::{GuardOutcome, SessionGuard};
use crate::panel::PanelUser;
use crate::validation::ProductDraft;

#[derive(Subcommand)]
pub enum ProductCommands {
    #[command(about = "List products, one page at a time")]
    List {
        #[arg(long, help = "Page number (1-based)")]
        page: Option<u32>,
        #[arg(long, help = "Page size")]
        limit: Option<u32>,
        #[arg(long, help = "Search term, matched against the name")]
        search: Option<String>,
        #[arg(long, help = "Full query string, e.g. 'page=2&limit=20&search=mug'")]
        query: Option<String>,
    },

    #[command(about = "Show a single product")]
    Get {
        #[arg(help = "Product id")]
        id: Uuid,
    },

    #[command(about = "Create a product")]
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        slug: String,
        #[arg(long)]
        price: f64,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, help = "Image URL")]
        image: Option<String>,
    },

    #[command(about = "Replace a product's fields")]
    Update {
        #[arg(help = "Product id")]
        id: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long)]
        slug: String,
        #[arg(long)]
        price: f64,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, help = "Image URL")]
        image: Option<String>,
    },

    #[command(about = "Delete a product")]
    Delete {
        #[arg(help = "Product id")]
        id: Uuid,
    },

    #[command(about = "Browse products interactively (live search, paging)")]
    Browse {
        #[arg(long, help = "Initial query string, e.g. 'page=2&search=mug'")]
        query: Option<String>,
    },
}

pub async fn handle(cmd: ProductCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let (gateway, _) = gateway()?;

    // Session guard: resolve the user before any product fetch; bail to the
    // login hint when there is no session.
    let user = match SessionGuard::new(&*gateway).check().await {
        Ok(GuardOutcome::Allow(user)) => user,
        Ok(GuardOutcome::Redirect(_)) => {
            utils::output_error(&output_format, "Not logged in. Run: stockroom auth login")?;
            std::process::exit(1);
        }
        Err(e) => {
            utils::output_error(&output_format, &e.to_string())?;
            std::process::exit(1);
        }
    };

    match cmd {
        ProductCommands::List {
            page,
            limit,
            search,
            query,
        } => {
            let mut list_query = query
                .as_deref()
                .map(ListQuery::parse)
                .unwrap_or_default();
            if let Some(page) = page {
                list_query = list_query.with_page(page);
            }
            if let Some(limit) = limit {
                list_query = list_query.with_limit(limit);
            }
            if let Some(search) = search {
                list_query = list_query.with_search(search);
            }

            let page_data = gateway
                .list(&ListRequest {
                    page: list_query.page,
                    limit: list_query.limit,
                    search: list_query.search.clone(),
                })
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;

            match output_format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "success": true,
                            "items": page_data.items,
                            "total_count": page_data.total_count,
                            "query": list_query.to_query_string(),
                        }))?
                    );
                }
                OutputFormat::Text => {
                    render_page(&list_query, &page_data);
                }
            }
            Ok(())
        }

        ProductCommands::Get { id } => {
            let product = gateway
                .get(id)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&product)?)
                }
                OutputFormat::Text => render_product(&product),
            }
            Ok(())
        }

        ProductCommands::Create {
            name,
            slug,
            price,
            description,
            image,
        } => {
            let draft = ProductDraft {
                name,
                slug,
                price,
                description,
                image,
            };
            let mut flow = ProductFormFlow::new(&*gateway);
            match flow.submit_create(&draft).await {
                SubmitOutcome::Completed((_, _)) => {
                    utils::output_success(&output_format, "Product created", None)
                }
                SubmitOutcome::Invalid(errors) => {
                    utils::output_field_errors(&output_format, &errors)?;
                    std::process::exit(1);
                }
                SubmitOutcome::Rejected(message) => {
                    utils::output_error(&output_format, &message)?;
                    std::process::exit(1);
                }
            }
        }

        ProductCommands::Update {
            id,
            name,
            slug,
            price,
            description,
            image,
        } => {
            let draft = ProductDraft {
                name,
                slug,
                price,
                description,
                image,
            };
            let mut flow = ProductFormFlow::new(&*gateway);
            match flow.submit_update(id, &draft).await {
                SubmitOutcome::Completed((_, _)) => {
                    utils::output_success(&output_format, "Product updated", None)
                }
                SubmitOutcome::Invalid(errors) => {
                    utils::output_field_errors(&output_format, &errors)?;
                    std::process::exit(1);
                }
                SubmitOutcome::Rejected(message) => {
                    utils::output_error(&output_format, &message)?;
                    std::process::exit(1);
                }
            }
        }

        ProductCommands::Delete { id } => {
            let mut flow = ProductFormFlow::new(&*gateway);
            match flow.submit_delete(id).await {
                SubmitOutcome::Completed((_, _)) => {
                    utils::output_success(&output_format, "Product deleted", None)
                }
                SubmitOutcome::Invalid(errors) => {
                    utils::output_field_errors(&output_format, &errors)?;
                    std::process::exit(1);
                }
                SubmitOutcome::Rejected(message) => {
                    utils::output_error(&output_format, &message)?;
                    std::process::exit(1);
                }
            }
        }

        ProductCommands::Browse { query } => {
            let initial = query.as_deref().map(ListQuery::parse).unwrap_or_default();
            browse(gateway, user, initial).await
        }
    }
}

/// Interactive driver for the list state controller.
///
/// Executes the controller's actions for real: fetches run as spawned tasks
/// feeding completions back through a channel (so a superseded response can
/// genuinely arrive late and be discarded), and the debounce timer is a live
/// `sleep_until`.
async fn browse(
    gateway: Arc<HttpGateway>,
    user: PanelUser,
    initial: ListQuery,
) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<ListEvent>();

    let (mut controller, actions) = ListController::mount(initial);
    let mut debounce: Option<(u32, tokio::time::Instant)> = None;

    println!("Browsing products as {}.", user.display_label());
    println!("Commands: /term search, n/p page, g <n> goto, l <n> page size, v <id> view, d <id> delete, r refresh, q quit");

    let mut pending = actions;
    execute(&gateway, &user, &tx, &mut debounce, &mut controller, pending.drain(..))?;
    render(&controller);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let deadline = debounce.map(|(_, at)| at);

        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                let actions = controller.handle(event);
                execute(&gateway, &user, &tx, &mut debounce, &mut controller, actions.into_iter())?;
                render(&controller);
            }

            fired = async {
                match deadline {
                    Some(at) => {
                        tokio::time::sleep_until(at).await;
                        true
                    }
                    None => std::future::pending().await,
                }
            } => {
                if fired {
                    if let Some((token, _)) = debounce.take() {
                        let actions = controller.handle(ListEvent::DebounceElapsed(token));
                        execute(&gateway, &user, &tx, &mut debounce, &mut controller, actions.into_iter())?;
                        render(&controller);
                    }
                }
            }

            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                let input = line.trim();

                let events = match parse_command(input, &controller) {
                    Command::Quit => break,
                    Command::Noop => vec![],
                    Command::Events(events) => events,
                    Command::View(id) => {
                        // Detail reads go through the cache; a mutation since
                        // the last view forces a re-fetch here.
                        if let Some(product) = controller.cached_detail(&id) {
                            render_product(product);
                            vec![]
                        } else {
                            match gateway.get(id).await {
                                Ok(product) => {
                                    render_product(&product);
                                    vec![ListEvent::DetailLoaded(product)]
                                }
                                Err(e) => {
                                    eprintln!("Error: {}", e);
                                    vec![]
                                }
                            }
                        }
                    }
                    Command::Delete(id) => {
                        let mut flow = ProductFormFlow::new(&*gateway);
                        match flow.submit_delete(id).await {
                            SubmitOutcome::Completed((mutation, _)) => {
                                println!("Deleted {}", id);
                                vec![ListEvent::MutationCommitted(mutation)]
                            }
                            SubmitOutcome::Rejected(message) => {
                                eprintln!("Error: {}", message);
                                vec![]
                            }
                            SubmitOutcome::Invalid(_) => vec![],
                        }
                    }
                };

                for event in events {
                    let actions = controller.handle(event);
                    execute(&gateway, &user, &tx, &mut debounce, &mut controller, actions.into_iter())?;
                }
                render(&controller);
            }
        }
    }

    Ok(())
}

enum Command {
    Quit,
    Noop,
    View(Uuid),
    Delete(Uuid),
    Events(Vec<ListEvent>),
}

fn parse_command(input: &str, controller: &ListController) -> Command {
    let query = controller.query();

    if input == "q" {
        return Command::Quit;
    }
    if input.is_empty() {
        return Command::Noop;
    }
    if let Some(term) = input.strip_prefix('/') {
        return Command::Events(vec![ListEvent::SearchInput(term.trim().to_string())]);
    }
    match input {
        "n" => Command::Events(vec![ListEvent::PageSelected(query.page + 1)]),
        "p" => Command::Events(vec![ListEvent::PageSelected(query.page.saturating_sub(1).max(1))]),
        "r" => Command::Events(vec![ListEvent::RetryRequested]),
        _ => {
            if let Some(n) = input.strip_prefix("g ").and_then(|s| s.trim().parse::<u32>().ok()) {
                Command::Events(vec![ListEvent::PageSelected(n)])
            } else if let Some(n) = input.strip_prefix("l ").and_then(|s| s.trim().parse::<u32>().ok()) {
                Command::Events(vec![ListEvent::LimitSelected(n)])
            } else if let Some(id) = input.strip_prefix("v ").and_then(|s| s.trim().parse::<Uuid>().ok()) {
                Command::View(id)
            } else if let Some(id) = input.strip_prefix("d ").and_then(|s| s.trim().parse::<Uuid>().ok()) {
                Command::Delete(id)
            } else {
                eprintln!("Unknown command: {}", input);
                Command::Noop
            }
        }
    }
}

/// Run the controller's requested side effects.
fn execute(
    gateway: &Arc<HttpGateway>,
    user: &PanelUser,
    tx: &mpsc::UnboundedSender<ListEvent>,
    debounce: &mut Option<(u32, tokio::time::Instant)>,
    controller: &mut ListController,
    actions: impl Iterator<Item = Action>,
) -> anyhow::Result<()> {
    // Collected first: executing one action (ResolveIdentity) feeds the
    // controller again and may produce follow-up actions.
    let mut queue: std::collections::VecDeque<Action> = actions.collect();

    while let Some(action) = queue.pop_front() {
        match action {
            Action::ResolveIdentity => {
                // The session guard already resolved the user for this view.
                let follow_up = controller.handle(ListEvent::IdentityResolved(Some(user.clone())));
                queue.extend(follow_up);
            }
            Action::ArmDebounce { token, window } => {
                *debounce = Some((token, tokio::time::Instant::now() + window));
            }
            Action::Fetch { generation, key } => {
                spawn_fetch(gateway.clone(), tx.clone(), generation, key);
            }
            Action::SyncUrl(query) => {
                println!("url: ?{}", query.to_query_string());
            }
            Action::RedirectToLogin => {
                anyhow::bail!("Session expired. Run: stockroom auth login");
            }
        }
    }
    Ok(())
}

fn spawn_fetch(
    gateway: Arc<HttpGateway>,
    tx: mpsc::UnboundedSender<ListEvent>,
    generation: u64,
    key: FetchKey,
) {
    tokio::spawn(async move {
        let result = gateway
            .list(&ListRequest {
                page: key.page,
                limit: key.limit,
                search: key.search.clone(),
            })
            .await;
        // The receiver may be gone if the view was quit mid-flight; the
        // result is simply dropped, which is exactly the cancellation rule.
        let _ = tx.send(ListEvent::FetchCompleted { generation, result });
    });
}

fn render(controller: &ListController) {
    match controller.state() {
        ViewState::Resolving => println!("Resolving session..."),
        ViewState::Loading => {
            if controller.search_pending() {
                println!("Loading... (search pending: {:?})", controller.search_input());
            } else {
                println!("Loading...");
            }
        }
        ViewState::Failed(message) => {
            println!("Error loading products: {} (r to retry)", message);
        }
        ViewState::Ready(ReadyView::Empty) => {
            println!("No products yet. Create your first one with: stockroom products create");
        }
        ViewState::Ready(ReadyView::NoResults { search }) => {
            println!("No products matching {:?}. Try adjusting your search.", search);
        }
        ViewState::Ready(ReadyView::Populated(page)) => {
            render_page(controller.query(), page);
        }
    }
}

fn render_page(query: &ListQuery, page: &ProductPage) {
    println!(
        "{:<36}  {:<24}  {:>10}  {:<20}",
        "ID", "NAME", "PRICE", "SLUG"
    );
    for product in &page.items {
        println!(
            "{:<36}  {:<24}  {:>10.2}  {:<20}",
            product.id, product.name, product.price, product.slug
        );
    }

    let total_pages = query::total_pages(page.total_count, query.limit);
    let prev = if query::has_prev(query.page) { "p: prev" } else { "(first page)" };
    let next = if query::has_next(query.page, query.limit, page.total_count) {
        "n: next"
    } else {
        "(last page)"
    };
    println!(
        "page {}/{} of {} products  [{} | {}]  ?{}",
        query.page,
        total_pages,
        page.total_count,
        prev,
        next,
        query.to_query_string()
    );
}

fn render_product(product: &Product) {
    println!("{}", product.name);
    println!("  id:          {}", product.id);
    println!("  slug:        {}", product.slug);
    println!("  price:       {:.2}", product.price);
    if let Some(description) = &product.description {
        println!("  description: {}", description);
    }
    if let Some(image) = &product.image {
        println!("  image:       {}", image);
    }
    println!("  created:     {}", product.created_at);
}
