//! State controller for the product list view.
//!
//! An explicit event -> actions state machine, so every rule the view relies
//! on is testable without rendering or I/O:
//!
//! - fetches are gated on identity resolution, not merely sequenced after it;
//! - raw keystrokes never fetch, only the debounced/committed search does;
//! - each issued fetch carries a generation, and a completion whose
//!   generation is not the latest is discarded, so a stale response can
//!   never overwrite fresher state;
//! - the URL-shaped [`ListQuery`] is the source of truth, and search/page-size
//!   changes reset the page position.
//!
//! The controller owns no transport: callers execute the returned [`Action`]s
//! (resolve the user, arm a timer, run a fetch, sync the URL) and feed the
//! outcomes back in as [`ListEvent`]s.

use std::time::Duration;

use uuid::Uuid;

use crate::database::models::{Product, ProductPage};

use super::cache::PanelCache;
use super::gateway::GatewayError;
use super::query::ListQuery;
use super::PanelUser;

/// Quiescence interval before raw input is promoted to committed search.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Everything a list fetch depends on. Also the list cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchKey {
    pub owner_id: Uuid,
    pub page: u32,
    pub limit: u32,
    /// Committed search only; the raw input value never appears here.
    pub search: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    /// Owner identity not yet known; no fetch may be issued.
    Resolving,
    /// Identity known, fetch in flight.
    Loading,
    Ready(ReadyView),
    /// Fetch failed; retry-eligible.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReadyView {
    /// Zero results without a search term.
    Empty,
    /// Zero results for a search term; messaged differently than [`Self::Empty`].
    NoResults { search: String },
    Populated(ProductPage),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Created,
    Updated(Uuid),
    Deleted(Uuid),
}

#[derive(Debug, Clone)]
pub enum ListEvent {
    /// Outcome of the identity resolution requested at mount.
    IdentityResolved(Option<PanelUser>),
    /// A raw keystroke in the search box.
    SearchInput(String),
    /// The debounce timer armed with this token fired.
    DebounceElapsed(u32),
    PageSelected(u32),
    LimitSelected(u32),
    /// The URL changed underneath the view (back navigation, manual edit).
    /// The URL wins: local input state is re-seeded from it.
    UrlChanged(ListQuery),
    FetchCompleted {
        generation: u64,
        result: Result<ProductPage, GatewayError>,
    },
    /// A detail view fetched this product; cache it for revisits until a
    /// mutation invalidates it.
    DetailLoaded(Product),
    /// A create/update/delete somewhere in the panel succeeded.
    MutationCommitted(Mutation),
    RetryRequested,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Ask the identity gateway for the current user, then feed
    /// [`ListEvent::IdentityResolved`] back in.
    ResolveIdentity,
    /// (Re)arm the debounce timer; only the latest token is honored.
    ArmDebounce { token: u32, window: Duration },
    /// Run the list fetch and feed [`ListEvent::FetchCompleted`] back in
    /// with the same generation.
    Fetch { generation: u64, key: FetchKey },
    /// Write the query state back to the URL.
    SyncUrl(ListQuery),
    RedirectToLogin,
}

#[derive(Debug, Clone, PartialEq)]
enum Identity {
    Unresolved,
    Anonymous,
    Known(PanelUser),
}

#[derive(Debug)]
pub struct ListController {
    query: ListQuery,
    /// Raw search box contents; updates on every keystroke.
    input: String,
    /// Debounced search value; the only one that participates in fetches.
    committed: String,
    debounce_token: u32,
    debounce_window: Duration,
    identity: Identity,
    generation: u64,
    in_flight: Option<FetchKey>,
    state: ViewState,
    cache: PanelCache,
}

impl ListController {
    /// Mount the view with state taken from the URL.
    pub fn mount(query: ListQuery) -> (Self, Vec<Action>) {
        Self::with_debounce_window(query, DEBOUNCE_WINDOW)
    }

    pub fn with_debounce_window(query: ListQuery, window: Duration) -> (Self, Vec<Action>) {
        let controller = Self {
            input: query.search.clone(),
            committed: query.search.clone(),
            query,
            debounce_token: 0,
            debounce_window: window,
            identity: Identity::Unresolved,
            generation: 0,
            in_flight: None,
            state: ViewState::Resolving,
            cache: PanelCache::new(),
        };
        (controller, vec![Action::ResolveIdentity])
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    pub fn search_input(&self) -> &str {
        &self.input
    }

    pub fn committed_search(&self) -> &str {
        &self.committed
    }

    pub fn user(&self) -> Option<&PanelUser> {
        match &self.identity {
            Identity::Known(user) => Some(user),
            _ => None,
        }
    }

    /// True while the box shows newer text than the results reflect.
    pub fn search_pending(&self) -> bool {
        self.input != self.committed
    }

    /// Cached single product, if a detail view loaded it and no mutation has
    /// invalidated it since.
    pub fn cached_detail(&self, id: &Uuid) -> Option<&Product> {
        self.cache.get_detail(id)
    }

    pub fn handle(&mut self, event: ListEvent) -> Vec<Action> {
        match event {
            ListEvent::IdentityResolved(None) => {
                self.identity = Identity::Anonymous;
                vec![Action::RedirectToLogin]
            }
            ListEvent::IdentityResolved(Some(user)) => {
                self.identity = Identity::Known(user);
                self.refetch()
            }
            ListEvent::SearchInput(text) => {
                self.input = text;
                self.debounce_token = self.debounce_token.wrapping_add(1);
                vec![Action::ArmDebounce {
                    token: self.debounce_token,
                    window: self.debounce_window,
                }]
            }
            ListEvent::DebounceElapsed(token) => {
                // A newer keystroke re-armed the timer; this firing is stale.
                if token != self.debounce_token {
                    return vec![];
                }
                self.commit_search()
            }
            ListEvent::PageSelected(page) => {
                let page = page.max(1);
                if page == self.query.page {
                    return vec![];
                }
                self.query = self.query.with_page(page);
                self.sync_and_refetch()
            }
            ListEvent::LimitSelected(limit) => {
                if limit == self.query.limit {
                    return vec![];
                }
                self.query = self.query.with_limit(limit);
                self.sync_and_refetch()
            }
            ListEvent::UrlChanged(query) => {
                // The URL is authoritative: reset input state and cancel any
                // pending debounce by bumping the token.
                self.input = query.search.clone();
                self.committed = query.search.clone();
                self.debounce_token = self.debounce_token.wrapping_add(1);
                self.query = query;
                self.refetch()
            }
            ListEvent::FetchCompleted { generation, result } => {
                // Superseded request; a fresher fetch owns the view now.
                if generation != self.generation {
                    return vec![];
                }
                let key = match self.in_flight.take() {
                    Some(key) => key,
                    None => return vec![],
                };
                match result {
                    Ok(page) => {
                        self.cache.put_list(key.clone(), page.clone());
                        self.state = Self::classify(page, &key.search);
                    }
                    Err(e) => {
                        self.state = ViewState::Failed(e.to_string());
                    }
                }
                vec![]
            }
            ListEvent::DetailLoaded(product) => {
                self.cache.put_detail(product);
                vec![]
            }
            ListEvent::MutationCommitted(mutation) => {
                self.cache.invalidate_lists();
                match &mutation {
                    Mutation::Updated(id) | Mutation::Deleted(id) => {
                        self.cache.invalidate_detail(id);
                    }
                    Mutation::Created => {}
                }
                self.refetch()
            }
            ListEvent::RetryRequested => self.refetch(),
        }
    }

    /// Promote the raw input to committed search once the window elapses.
    fn commit_search(&mut self) -> Vec<Action> {
        if self.input == self.committed {
            return vec![];
        }
        self.committed = self.input.clone();

        if self.committed != self.query.search {
            // A new search invalidates the pagination position.
            self.query = self.query.with_search(self.committed.clone());
            self.sync_and_refetch()
        } else {
            // Input drifted and came back (e.g. "mug" -> "mugs" -> "mug"
            // within one window): nothing the URL or fetch key would notice.
            vec![]
        }
    }

    fn sync_and_refetch(&mut self) -> Vec<Action> {
        let mut actions = vec![Action::SyncUrl(self.query.clone())];
        actions.extend(self.refetch());
        actions
    }

    /// Issue the fetch for the current key, unless identity is unknown or
    /// the cache already holds the page.
    fn refetch(&mut self) -> Vec<Action> {
        let user = match &self.identity {
            Identity::Known(user) => user,
            Identity::Anonymous => return vec![Action::RedirectToLogin],
            Identity::Unresolved => {
                self.state = ViewState::Resolving;
                return vec![];
            }
        };

        let key = FetchKey {
            owner_id: user.id,
            page: self.query.page,
            limit: self.query.limit,
            search: self.committed.clone(),
        };

        if let Some(page) = self.cache.get_list(&key) {
            self.state = Self::classify(page.clone(), &key.search);
            self.in_flight = None;
            return vec![];
        }

        self.state = ViewState::Loading;
        self.generation += 1;
        self.in_flight = Some(key.clone());
        vec![Action::Fetch {
            generation: self.generation,
            key,
        }]
    }

    fn classify(page: ProductPage, search: &str) -> ViewState {
        if page.items.is_empty() && page.total_count == 0 {
            if search.is_empty() {
                ViewState::Ready(ReadyView::Empty)
            } else {
                ViewState::Ready(ReadyView::NoResults {
                    search: search.to_string(),
                })
            }
        } else {
            ViewState::Ready(ReadyView::Populated(page))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Product;
    use chrono::Utc;

    fn user() -> PanelUser {
        PanelUser {
            id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            display_name: Some("Ada".into()),
        }
    }

    fn product(name: &str) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.into(),
            slug: name.to_lowercase().replace(' ', "-"),
            price: 4.2,
            description: None,
            image: None,
            user_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    fn page_of(names: &[&str], total_count: i64) -> ProductPage {
        ProductPage {
            items: names.iter().map(|n| product(n)).collect(),
            total_count,
        }
    }

    fn fetches(actions: &[Action]) -> Vec<(u64, FetchKey)> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Fetch { generation, key } => Some((*generation, key.clone())),
                _ => None,
            })
            .collect()
    }

    fn mounted_with_user(query: ListQuery) -> (ListController, Vec<Action>) {
        let (mut controller, actions) = ListController::mount(query);
        assert_eq!(actions, vec![Action::ResolveIdentity]);
        let actions = controller.handle(ListEvent::IdentityResolved(Some(user())));
        (controller, actions)
    }

    #[test]
    fn mount_resolves_identity_before_any_fetch() {
        let (controller, actions) = ListController::mount(ListQuery::default());
        assert_eq!(*controller.state(), ViewState::Resolving);
        assert!(fetches(&actions).is_empty());
    }

    #[test]
    fn anonymous_user_redirects_and_never_fetches() {
        let (mut controller, _) = ListController::mount(ListQuery::default());
        let actions = controller.handle(ListEvent::IdentityResolved(None));
        assert_eq!(actions, vec![Action::RedirectToLogin]);

        // Later interactions still refuse to fetch.
        let actions = controller.handle(ListEvent::PageSelected(2));
        assert!(fetches(&actions).is_empty());
    }

    #[test]
    fn identity_resolution_issues_fetch_keyed_by_url_state() {
        let query = ListQuery::parse("page=2&limit=20&search=mug");
        let (controller, actions) = mounted_with_user(query);

        assert_eq!(*controller.state(), ViewState::Loading);
        let issued = fetches(&actions);
        assert_eq!(issued.len(), 1);
        let (_, key) = &issued[0];
        assert_eq!(key.page, 2);
        assert_eq!(key.limit, 20);
        assert_eq!(key.search, "mug");
    }

    #[test]
    fn keystrokes_arm_debounce_without_fetching() {
        let (mut controller, _) = mounted_with_user(ListQuery::default());

        let actions = controller.handle(ListEvent::SearchInput("c".into()));
        assert!(fetches(&actions).is_empty());
        assert!(matches!(actions[0], Action::ArmDebounce { token: 1, .. }));
        assert_eq!(controller.search_input(), "c");
        assert!(controller.search_pending());
    }

    #[test]
    fn corrected_input_within_window_fetches_exactly_once() {
        let (mut controller, _) = mounted_with_user(ListQuery::default());

        controller.handle(ListEvent::SearchInput("coffe".into()));
        controller.handle(ListEvent::SearchInput("coffee".into()));

        // The first timer fires late; its token was superseded.
        assert!(controller.handle(ListEvent::DebounceElapsed(1)).is_empty());

        let actions = controller.handle(ListEvent::DebounceElapsed(2));
        let issued = fetches(&actions);
        assert_eq!(issued.len(), 1);
        assert_eq!(issued[0].1.search, "coffee");
        assert_eq!(issued[0].1.page, 1);

        // The URL was updated alongside.
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::SyncUrl(q) if q.search == "coffee" && q.page == 1
        )));
    }

    #[test]
    fn input_returning_to_committed_value_is_a_no_op() {
        let (mut controller, _) = mounted_with_user(ListQuery::parse("search=mug"));

        controller.handle(ListEvent::SearchInput("mugs".into()));
        controller.handle(ListEvent::SearchInput("mug".into()));
        let actions = controller.handle(ListEvent::DebounceElapsed(2));
        assert!(actions.is_empty());
    }

    #[test]
    fn stale_completion_is_discarded() {
        let (mut controller, actions) = mounted_with_user(ListQuery::default());
        let (gen1, _) = fetches(&actions)[0].clone();

        let actions = controller.handle(ListEvent::PageSelected(2));
        let (gen2, _) = fetches(&actions)[0].clone();
        assert!(gen2 > gen1);

        let page2 = page_of(&["Late Mug"], 13);
        controller.handle(ListEvent::FetchCompleted {
            generation: gen2,
            result: Ok(page2.clone()),
        });
        assert_eq!(
            *controller.state(),
            ViewState::Ready(ReadyView::Populated(page2.clone()))
        );

        // The page-1 response arrives after the page-2 one; it must not win.
        controller.handle(ListEvent::FetchCompleted {
            generation: gen1,
            result: Ok(page_of(&["Stale Mug"], 13)),
        });
        assert_eq!(
            *controller.state(),
            ViewState::Ready(ReadyView::Populated(page2))
        );
    }

    #[test]
    fn limit_change_resets_page_and_page_change_keeps_limit() {
        let (mut controller, _) = mounted_with_user(ListQuery::parse("page=3&limit=10"));

        let actions = controller.handle(ListEvent::LimitSelected(50));
        let (_, key) = &fetches(&actions)[0];
        assert_eq!((key.page, key.limit), (1, 50));

        let actions = controller.handle(ListEvent::PageSelected(2));
        let (_, key) = &fetches(&actions)[0];
        assert_eq!((key.page, key.limit), (2, 50));
    }

    #[test]
    fn revisited_page_is_served_from_cache() {
        let (mut controller, actions) = mounted_with_user(ListQuery::default());
        let (gen1, _) = fetches(&actions)[0].clone();
        controller.handle(ListEvent::FetchCompleted {
            generation: gen1,
            result: Ok(page_of(&["Mug"], 13)),
        });

        let actions = controller.handle(ListEvent::PageSelected(2));
        let (gen2, _) = fetches(&actions)[0].clone();
        controller.handle(ListEvent::FetchCompleted {
            generation: gen2,
            result: Ok(page_of(&["Cup"], 13)),
        });

        // Going back to page 1 touches the cache, not the network.
        let actions = controller.handle(ListEvent::PageSelected(1));
        assert!(fetches(&actions).is_empty());
        match controller.state() {
            ViewState::Ready(ReadyView::Populated(page)) => {
                assert_eq!(page.items[0].name, "Mug");
            }
            other => panic!("expected populated state, got {:?}", other),
        }
    }

    #[test]
    fn mutation_invalidates_cache_and_refetches() {
        let (mut controller, actions) = mounted_with_user(ListQuery::default());
        let (gen1, _) = fetches(&actions)[0].clone();
        controller.handle(ListEvent::FetchCompleted {
            generation: gen1,
            result: Ok(page_of(&["Mug"], 1)),
        });

        let actions = controller.handle(ListEvent::MutationCommitted(Mutation::Created));
        // The cached page for the current key is gone, so this must hit the
        // network again.
        assert_eq!(fetches(&actions).len(), 1);
        assert_eq!(*controller.state(), ViewState::Loading);
    }

    #[test]
    fn detail_cache_serves_revisits_until_a_mutation_invalidates_it() {
        let (mut controller, _) = mounted_with_user(ListQuery::default());
        let kept = product("Kept");
        let edited = product("Edited");

        controller.handle(ListEvent::DetailLoaded(kept.clone()));
        controller.handle(ListEvent::DetailLoaded(edited.clone()));
        assert_eq!(controller.cached_detail(&edited.id), Some(&edited));

        // Updating one product drops only its detail entry.
        controller.handle(ListEvent::MutationCommitted(Mutation::Updated(edited.id)));
        assert!(controller.cached_detail(&edited.id).is_none());
        assert_eq!(controller.cached_detail(&kept.id), Some(&kept));

        controller.handle(ListEvent::MutationCommitted(Mutation::Deleted(kept.id)));
        assert!(controller.cached_detail(&kept.id).is_none());
    }

    #[test]
    fn zero_results_distinguish_empty_from_no_results() {
        let (mut controller, actions) = mounted_with_user(ListQuery::default());
        let (gen, _) = fetches(&actions)[0].clone();
        controller.handle(ListEvent::FetchCompleted {
            generation: gen,
            result: Ok(page_of(&[], 0)),
        });
        assert_eq!(*controller.state(), ViewState::Ready(ReadyView::Empty));

        controller.handle(ListEvent::SearchInput("zzz".into()));
        let actions = controller.handle(ListEvent::DebounceElapsed(1));
        let (gen, _) = fetches(&actions)[0].clone();
        controller.handle(ListEvent::FetchCompleted {
            generation: gen,
            result: Ok(page_of(&[], 0)),
        });
        assert_eq!(
            *controller.state(),
            ViewState::Ready(ReadyView::NoResults { search: "zzz".into() })
        );
    }

    #[test]
    fn url_change_is_authoritative_and_cancels_pending_debounce() {
        let (mut controller, _) = mounted_with_user(ListQuery::default());

        controller.handle(ListEvent::SearchInput("typed".into()));
        let actions = controller.handle(ListEvent::UrlChanged(ListQuery::parse("page=2&search=mug")));

        assert_eq!(controller.search_input(), "mug");
        assert_eq!(controller.committed_search(), "mug");
        let issued = fetches(&actions);
        assert_eq!(issued.len(), 1);
        assert_eq!(issued[0].1.search, "mug");
        assert_eq!(issued[0].1.page, 2);

        // The timer armed for "typed" fires afterwards and must do nothing.
        assert!(controller.handle(ListEvent::DebounceElapsed(1)).is_empty());
    }

    #[test]
    fn failed_fetch_is_retry_eligible() {
        let (mut controller, actions) = mounted_with_user(ListQuery::default());
        let (gen, _) = fetches(&actions)[0].clone();
        controller.handle(ListEvent::FetchCompleted {
            generation: gen,
            result: Err(GatewayError::Unavailable("Connection failed".into())),
        });
        assert!(matches!(controller.state(), ViewState::Failed(_)));

        let actions = controller.handle(ListEvent::RetryRequested);
        assert_eq!(fetches(&actions).len(), 1);
        assert_eq!(*controller.state(), ViewState::Loading);
    }
}
