//! Runs the built-in storefront suite against an in-memory replica of the
//! shop, so every scenario is exercised end to end without a browser.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::{Arc, Mutex};
use vitrine::mock::{MockDriver, MockElement, MockFactory};
use vitrine::saucedemo::{self, selectors::*, CART_PAGE, INVENTORY_PAGE, ITEM_4_PAGE};
use vitrine::{
    ActionOutcome, Context, Locator, RunConfig, RunReport, ScenarioStatus, Step, SuiteRunner,
    VitrineError,
};

const BASE: &str = "https://shop.test";
const ABOUT: &str = "https://about.shop.test/";

const SORT_OPTIONS: [&str; 4] = [
    "Name (A to Z)",
    "Name (Z to A)",
    "Price (low to high)",
    "Price (high to low)",
];

const PRODUCTS: [(&str, &str); 6] = [
    ("Sauce Labs Backpack", "$29.99"),
    ("Sauce Labs Bike Light", "$9.99"),
    ("Sauce Labs Bolt T-Shirt", "$15.99"),
    ("Sauce Labs Fleece Jacket", "$49.99"),
    ("Sauce Labs Onesie", "$7.99"),
    ("Test.allTheThings() T-Shirt (Red)", "$15.99"),
];

/// Application state that outlives page loads, like the shop's local storage
#[derive(Debug, Default)]
struct Shop {
    cart: Vec<String>,
    descending: bool,
    menu_open: bool,
    break_badge: bool,
}

impl Shop {
    fn catalog(&self) -> Vec<&'static str> {
        let mut names: Vec<&str> = PRODUCTS.iter().map(|(n, _)| *n).collect();
        if self.descending {
            names.reverse();
        }
        names
    }
}

fn url(path: &str) -> String {
    format!("{BASE}/{path}")
}

fn price(name: &str) -> &'static str {
    PRODUCTS
        .iter()
        .find(|(n, _)| *n == name)
        .map_or("", |(_, p)| *p)
}

fn header(shop: &Shop) -> Vec<MockElement> {
    let mut elements = vec![
        MockElement::new(MENU_BUTTON, "button").with_text("Open Menu"),
        MockElement::new(CART_LINK, "a"),
    ];
    let about = MockElement::new(ABOUT_LINK, "a").with_text("About");
    let reset = MockElement::new(RESET_LINK, "a").with_text("Reset App State");
    if shop.menu_open {
        elements.extend([about, reset]);
    } else {
        elements.extend([about.hidden(), reset.hidden()]);
    }
    if !shop.cart.is_empty() {
        let count = if shop.break_badge {
            shop.cart.len() + 1
        } else {
            shop.cart.len()
        };
        elements.push(MockElement::new(CART_BADGE, "span").with_text(count.to_string()));
    }
    elements
}

fn inventory(shop: &Shop) -> Vec<MockElement> {
    let mut elements = header(shop);
    elements.push(MockElement::select(SORT, SORT_OPTIONS));
    for (i, name) in shop.catalog().into_iter().enumerate() {
        let label = if shop.cart.iter().any(|c| c == name) {
            "Remove"
        } else {
            "Add to cart"
        };
        elements.extend([
            MockElement::new(ITEM, "div"),
            MockElement::new(ITEM_NAME, "div").with_text(name),
            MockElement::new(ITEM_PRICE, "div").with_text(price(name)),
            MockElement::new(ITEM_IMAGE, "img")
                .with_attr("src", format!("/static/media/item-{i}.jpg")),
            MockElement::new(ITEM_BUTTON, "button").with_text(label),
        ]);
    }
    elements.push(MockElement::new(ITEM_4_TITLE, "a").with_text(PRODUCTS[3].0));
    elements
}

fn cart(shop: &Shop) -> Vec<MockElement> {
    let mut elements = header(shop);
    for name in &shop.cart {
        elements.extend([
            MockElement::new(ITEM, "div"),
            MockElement::new(ITEM_NAME, "div").with_text(name.clone()),
            MockElement::new(ITEM_PRICE, "div").with_text(price(name)),
        ]);
    }
    elements.push(MockElement::new(CONTINUE_SHOPPING, "button").with_text("Continue Shopping"));
    elements
}

fn item_page(shop: &Shop) -> Vec<MockElement> {
    let mut elements = header(shop);
    elements.push(MockElement::new(BACK_TO_PRODUCTS, "button").with_text("Back to products"));
    elements
}

fn login_page() -> Vec<MockElement> {
    vec![
        MockElement::input(USERNAME),
        MockElement::input(PASSWORD),
        MockElement::new(LOGIN_BUTTON, "input").with_attr("value", "Login"),
    ]
}

fn with_shop<T>(shop: &Arc<Mutex<Shop>>, f: impl FnOnce(&mut Shop) -> T) -> T {
    f(&mut shop.lock().unwrap())
}

/// Builds one isolated session of the replica shop
fn storefront(password: &'static str, break_badge: bool) -> MockDriver {
    let shop = Arc::new(Mutex::new(Shop {
        break_badge,
        ..Shop::default()
    }));
    let (s1, s2, s3) = (shop.clone(), shop.clone(), shop.clone());
    let (menu, reset, buy, sort, nav) = (
        shop.clone(),
        shop.clone(),
        shop.clone(),
        shop.clone(),
        shop.clone(),
    );

    MockDriver::new()
        .page(BASE, login_page())
        .page(ABOUT, vec![MockElement::new("h1", "h1").with_text("About")])
        .route(url(INVENTORY_PAGE), move |_| inventory(&s1.lock().unwrap()))
        .route(url(CART_PAGE), move |_| cart(&s2.lock().unwrap()))
        .route(url(ITEM_4_PAGE), move |_| item_page(&s3.lock().unwrap()))
        .on(LOGIN_BUTTON, move |state, _| {
            let user = state.attribute(USERNAME, 0, "value").unwrap_or_default().to_string();
            let pass = state.attribute(PASSWORD, 0, "value").unwrap_or_default().to_string();
            if user == "standard_user" && pass == password {
                state.visit(&url(INVENTORY_PAGE)).unwrap();
            }
        })
        .on(MENU_BUTTON, move |state, _| {
            with_shop(&menu, |s| s.menu_open = true);
            state.refresh().unwrap();
        })
        .on(RESET_LINK, move |state, _| {
            with_shop(&reset, |s| {
                s.cart.clear();
                s.menu_open = false;
            });
            state.refresh().unwrap();
        })
        .on(ABOUT_LINK, move |state, _| {
            with_shop(&nav, |s| s.menu_open = false);
            state.visit(ABOUT).unwrap();
        })
        .on(ITEM_BUTTON, move |state, element| {
            with_shop(&buy, |s| {
                let name = s.catalog()[element.index].to_string();
                if let Some(pos) = s.cart.iter().position(|c| *c == name) {
                    s.cart.remove(pos);
                } else {
                    s.cart.push(name);
                }
            });
            state.refresh().unwrap();
        })
        .on(SORT, move |state, _| {
            let choice = state.attribute(SORT, 0, "value").unwrap_or_default().to_string();
            with_shop(&sort, |s| s.descending = choice == "Name (Z to A)");
            state.refresh().unwrap();
        })
        .link(CART_LINK, url(CART_PAGE))
        .link(CONTINUE_SHOPPING, url(INVENTORY_PAGE))
        .link(ITEM_4_TITLE, url(ITEM_4_PAGE))
        .link(BACK_TO_PRODUCTS, url(INVENTORY_PAGE))
}

fn config() -> RunConfig {
    RunConfig::new()
        .with_base_url(BASE)
        .with_timeout(150)
        .with_poll_interval(5)
        .with_max_sessions(3)
}

/// Run `steps` in order on one session, sharing `ctx`
async fn perform(driver: &mut MockDriver, steps: &[Step], ctx: &mut Context) {
    let executor = config().executor();
    for step in steps {
        if let Err(failure) = executor.execute(step, driver, ctx).await {
            panic!("{failure}");
        }
    }
}

async fn run(factory: MockFactory, group: Option<&str>) -> RunReport {
    let config = config();
    let suite = saucedemo::suite(&config).select(group).unwrap();
    SuiteRunner::new(Arc::new(factory), &config).run(&suite).await
}

fn status(report: &RunReport, name: &str) -> ScenarioStatus {
    report
        .scenarios
        .iter()
        .find(|s| s.name == name)
        .map(|s| s.status)
        .unwrap_or_else(|| panic!("no scenario {name}"))
}

#[tokio::test]
async fn test_full_suite_passes_against_replica() {
    let factory = MockFactory::new(|| storefront("secret_sauce", false));
    let report = run(factory.clone(), None).await;

    let failures: Vec<_> = report
        .scenarios
        .iter()
        .filter(|s| s.status.is_failed())
        .map(|s| format!("{}: {:?} {:?}", s.name, s.failing_step, s.error))
        .collect();
    assert!(failures.is_empty(), "{failures:#?}");
    assert_eq!(report.summary.passed, 8);
    assert_eq!(report.summary.empty, 7);
    assert!(report.all_ok());

    // three groups need a browser, the placeholder groups do not
    let sessions = factory.launched();
    assert_eq!(sessions.len(), 3);
    assert!(sessions.iter().all(|s| s.state().unwrap().is_closed()));
}

#[tokio::test]
async fn test_login_lands_on_catalog() {
    let factory = MockFactory::new(|| storefront("secret_sauce", false));
    let report = run(factory.clone(), Some("login-navigation")).await;
    assert_eq!(
        status(&report, "redirects to the catalog after login"),
        ScenarioStatus::Passed
    );
    let session = &factory.launched()[0];
    assert!(session.was_called("type:[data-test=\"username\"]#0=standard_user"));

    let mut driver = storefront("secret_sauce", false);
    perform(&mut driver, &saucedemo::login(&config()), &mut Context::new()).await;
    let state = driver.state().unwrap();
    assert_eq!(state.url(), url(INVENTORY_PAGE));
    assert!(!state.calls().iter().any(|c| c == "navigate:https://shop.test/inventory.html"));
}

#[tokio::test]
async fn test_wrong_password_fails_at_setup() {
    let factory = MockFactory::new(|| storefront("another_secret", false));
    let report = run(factory, Some("catalog")).await;
    assert_eq!(report.summary.failed, 3);
    let first = &report.scenarios[0];
    assert_eq!(
        first.failing_step.as_deref(),
        Some("setup: assert url equals \"https://shop.test/inventory.html\"")
    );
    assert_eq!(first.actual.as_deref(), Some("https://shop.test"));
    assert!(!report.all_ok());
}

#[tokio::test]
async fn test_cart_names_carry_across_pages() {
    let factory = MockFactory::new(|| storefront("secret_sauce", false));
    let report = run(factory.clone(), Some("cart")).await;
    assert_eq!(
        status(&report, "cart counter follows every add"),
        ScenarioStatus::Passed
    );
    assert_eq!(
        status(&report, "added products appear in the cart"),
        ScenarioStatus::Passed
    );
    assert_eq!(
        status(&report, "cart enforces its maximum number of products"),
        ScenarioStatus::Empty
    );
    // the reset between scenarios went through the menu
    let calls = factory.launched()[0].state().unwrap().calls().to_vec();
    let resets = calls
        .iter()
        .filter(|c| c.starts_with("click:[data-test=\"reset-sidebar-link\"]"))
        .count();
    assert_eq!(resets, 2);
}

#[tokio::test]
async fn test_first_cart_line_recalls_backpack() {
    let config = config();
    let group = saucedemo::cart(&config);
    let mut driver = storefront("secret_sauce", false);
    let mut ctx = Context::new();
    perform(&mut driver, &group.setup, &mut ctx).await;
    perform(&mut driver, &group.scenarios[1].steps, &mut ctx).await;
    assert_eq!(ctx.recall("itemName@0").unwrap(), "Sauce Labs Backpack");

    perform(&mut driver, &[Step::navigate(url(CART_PAGE))], &mut ctx).await;
    let outcome = config
        .executor()
        .execute(
            &Step::read_text(Locator::new(ITEM_NAME).nth(0), "cartName"),
            &mut driver,
            &mut ctx,
        )
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ActionOutcome::Captured {
            key: "cartName".to_string(),
            value: "Sauce Labs Backpack".to_string(),
        }
    );
    assert_eq!(ctx.recall("cartName").unwrap(), ctx.recall("itemName@0").unwrap());
}

#[tokio::test]
async fn test_badge_out_of_step_is_reported() {
    let factory = MockFactory::new(|| storefront("secret_sauce", true));
    let report = run(factory, Some("cart")).await;
    let badge = report
        .scenarios
        .iter()
        .find(|s| s.name == "cart counter follows every add")
        .unwrap();
    assert_eq!(badge.status, ScenarioStatus::Failed);
    assert!(badge
        .failing_step
        .as_deref()
        .unwrap()
        .starts_with("for each [data-test=\"inventory-item\"] #1 > assert text of"));
    assert_eq!(badge.actual.as_deref(), Some("2"));
    assert_eq!(badge.expected.as_deref(), Some("1"));
}

#[tokio::test]
async fn test_sorted_catalog_passes_ordering_check() {
    let factory = MockFactory::new(|| storefront("secret_sauce", false));
    let report = run(factory.clone(), Some("catalog")).await;
    assert_eq!(
        status(&report, "sorting by name Z to A orders the catalog"),
        ScenarioStatus::Passed
    );
    assert!(factory.launched()[0].was_called("select:[data-test=\"product-sort-container\"]#0=Name (Z to A)"));
}

#[tokio::test]
async fn test_launch_failure_reports_each_runnable_scenario() {
    let factory = MockFactory::new(|| storefront("secret_sauce", false)).failing();
    let report = run(factory, None).await;
    assert_eq!(report.summary.failed, 8);
    assert_eq!(report.summary.empty, 7);
    let first = &report.scenarios[0];
    assert_eq!(first.failing_step.as_deref(), Some("launch session"));
    assert!(first.error.as_deref().unwrap().contains("mock launch refused"));
}

#[test]
fn test_unknown_group_is_a_usage_error() {
    let err = saucedemo::suite(&config()).select(Some("wishlist")).unwrap_err();
    assert!(err.is_usage());
    assert!(matches!(err, VitrineError::UnknownGroup { .. }));
}

#[tokio::test]
async fn test_report_renders_for_ci() {
    let factory = MockFactory::new(|| storefront("secret_sauce", false));
    let report = run(factory, Some("checkout")).await;
    let junit = report.render_junit();
    assert!(junit.contains("<testsuite name=\"checkout\""));
    assert_eq!(junit.matches("<skipped").count(), 3);
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["summary"]["empty"], 3);
}
