//! Built-in storefront suite.
//!
//! Elements are addressed through the storefront's `data-test` hooks plus an
//! explicit index, never by structural position.

use crate::compare::SortOrder;
use crate::config::RunConfig;
use crate::context::escape_placeholders;
use crate::locator::Locator;
use crate::scenario::{Scenario, ScenarioGroup};
use crate::step::{Expected, Step, Subject};
use crate::suite::Suite;

/// Selectors of the storefront markup
pub mod selectors {
    /// Login form user name
    pub const USERNAME: &str = r#"[data-test="username"]"#;
    /// Login form password
    pub const PASSWORD: &str = r#"[data-test="password"]"#;
    /// Login form submit
    pub const LOGIN_BUTTON: &str = r#"[data-test="login-button"]"#;

    /// One product card (catalog) or cart line (cart)
    pub const ITEM: &str = r#"[data-test="inventory-item"]"#;
    /// Product name within a card or line
    pub const ITEM_NAME: &str = r#"[data-test="inventory-item-name"]"#;
    /// Product price within a card or line
    pub const ITEM_PRICE: &str = r#"[data-test="inventory-item-price"]"#;
    /// Product image within a card
    pub const ITEM_IMAGE: &str = "img.inventory_item_img";
    /// Add-to-cart / remove button of a card
    pub const ITEM_BUTTON: &str = r#"[data-test="inventory-item"] button"#;
    /// Title link of product 4
    pub const ITEM_4_TITLE: &str = r#"[data-test="item-4-title-link"]"#;
    /// Catalog sort control
    pub const SORT: &str = r#"[data-test="product-sort-container"]"#;

    /// Header cart link
    pub const CART_LINK: &str = r#"[data-test="shopping-cart-link"]"#;
    /// Header cart counter
    pub const CART_BADGE: &str = r#"[data-test="shopping-cart-badge"]"#;
    /// Cart page "Continue Shopping"
    pub const CONTINUE_SHOPPING: &str = r#"[data-test="continue-shopping"]"#;
    /// Product page "Back to products"
    pub const BACK_TO_PRODUCTS: &str = r#"[data-test="back-to-products"]"#;

    /// Burger menu toggle
    pub const MENU_BUTTON: &str = "#react-burger-menu-btn";
    /// Menu "About" link
    pub const ABOUT_LINK: &str = r#"[data-test="about-sidebar-link"]"#;
    /// Menu "Reset App State" link
    pub const RESET_LINK: &str = r#"[data-test="reset-sidebar-link"]"#;
}

use selectors::*;

/// Catalog page path
pub const INVENTORY_PAGE: &str = "inventory.html";
/// Cart page path
pub const CART_PAGE: &str = "cart.html";
/// Product 4 detail page path
pub const ITEM_4_PAGE: &str = "inventory-item.html?id=4";

/// Sort option checked by the catalog group
pub const SORT_NAME_DESCENDING: &str = "Name (Z to A)";

/// The whole storefront suite for `config`
#[must_use]
pub fn suite(config: &RunConfig) -> Suite {
    Suite::new("saucedemo")
        .group(login_navigation(config))
        .group(catalog(config))
        .group(cart(config))
        .group(checkout())
        .group(account())
}

/// Log in and land on the catalog
#[must_use]
pub fn login(config: &RunConfig) -> Vec<Step> {
    vec![
        Step::navigate(escape_placeholders(&config.base_url)),
        Step::type_text(USERNAME, escape_placeholders(&config.username)),
        Step::type_text(PASSWORD, escape_placeholders(&config.password)),
        Step::click(LOGIN_BUTTON),
        Step::assert_url(page(config, INVENTORY_PAGE)),
    ]
}

/// Empty the cart through the menu, then reload the catalog.
///
/// The cart lives in browser storage and outlives a re-login, so scenarios
/// that count additions start from here.
#[must_use]
pub fn reset_cart(config: &RunConfig) -> Vec<Step> {
    vec![
        Step::click(MENU_BUTTON),
        Step::click(RESET_LINK),
        Step::navigate(page(config, INVENTORY_PAGE)),
        Step::assert_url(page(config, INVENTORY_PAGE)),
    ]
}

/// Configured page URL, safe from placeholder expansion
fn page(config: &RunConfig, path: &str) -> String {
    escape_placeholders(&config.url(path))
}

fn nth(selector: &str) -> Locator {
    Locator::new(selector).each()
}

/// Login redirect and page-to-page navigation
#[must_use]
pub fn login_navigation(config: &RunConfig) -> ScenarioGroup {
    ScenarioGroup::new("login-navigation")
        .with_setup(login(config))
        .scenario(Scenario::new(
            "redirects to the catalog after login",
            vec![Step::assert_url(page(config, INVENTORY_PAGE))],
        ))
        .scenario(Scenario::new(
            "navigation menu opens its links",
            vec![Step::click(MENU_BUTTON), Step::click(ABOUT_LINK)],
        ))
        .scenario(Scenario::new(
            "navigation links and buttons work on every page",
            vec![
                Step::click(CART_LINK),
                Step::assert_url(page(config, CART_PAGE)),
                Step::click(CONTINUE_SHOPPING),
                Step::assert_url(page(config, INVENTORY_PAGE)),
                Step::click(ITEM_4_TITLE),
                Step::assert_url(page(config, ITEM_4_PAGE)),
                Step::click(BACK_TO_PRODUCTS),
                Step::assert_url(page(config, INVENTORY_PAGE)),
            ],
        ))
}

/// Catalog listing, product details and sorting
#[must_use]
pub fn catalog(config: &RunConfig) -> ScenarioGroup {
    let more_than_five = Step::AssertCountAbove {
        selector: ITEM.to_string(),
        threshold: 5,
    };
    ScenarioGroup::new("catalog")
        .with_setup(login(config))
        .scenario(Scenario::new(
            "lists every product with name, price and add button",
            vec![
                more_than_five.clone(),
                Step::for_each(
                    ITEM,
                    vec![
                        Step::assert_visible(nth(ITEM_NAME)),
                        Step::assert_visible(nth(ITEM_PRICE)),
                        Step::assert_visible(nth(ITEM_BUTTON)),
                        Step::AssertContains {
                            subject: Subject::Text(nth(ITEM_BUTTON)),
                            expected: Expected::literal("Add to cart"),
                        },
                    ],
                ),
            ],
        ))
        .scenario(Scenario::new(
            "product details match what is displayed",
            vec![
                more_than_five.clone(),
                Step::for_each(
                    ITEM,
                    vec![
                        Step::assert_visible(nth(ITEM_NAME)),
                        Step::assert_visible(nth(ITEM_PRICE)),
                        Step::assert_visible(nth(ITEM_IMAGE)),
                        Step::AssertNotEmpty {
                            subject: Subject::Text(nth(ITEM_NAME)),
                        },
                        Step::AssertNotEmpty {
                            subject: Subject::Text(nth(ITEM_PRICE)),
                        },
                        Step::AssertContains {
                            subject: Subject::Attribute {
                                target: nth(ITEM_IMAGE),
                                name: "src".to_string(),
                            },
                            expected: Expected::literal("/static/media/"),
                        },
                    ],
                ),
            ],
        ))
        .scenario(Scenario::new(
            "sorting by name Z to A orders the catalog",
            vec![
                Step::select(SORT, SORT_NAME_DESCENDING),
                more_than_five,
                Step::AssertOrdered {
                    selector: ITEM_NAME.to_string(),
                    order: SortOrder::Descending,
                },
            ],
        ))
}

/// Adding products and checking the cart
#[must_use]
pub fn cart(config: &RunConfig) -> ScenarioGroup {
    let mut setup = login(config);
    setup.extend(reset_cart(config));
    ScenarioGroup::new("cart")
        .with_setup(setup)
        .scenario(Scenario::new(
            "cart counter follows every add",
            vec![
                Step::AssertCountAbove {
                    selector: ITEM.to_string(),
                    threshold: 5,
                },
                Step::for_each(
                    ITEM,
                    vec![
                        Step::AssertContains {
                            subject: Subject::Text(nth(ITEM_BUTTON)),
                            expected: Expected::literal("Add to cart"),
                        },
                        Step::click(nth(ITEM_BUTTON)),
                        Step::assert_text(CART_BADGE, Expected::literal("{ordinal}")),
                    ],
                ),
            ],
        ))
        .scenario(Scenario::new(
            "added products appear in the cart",
            vec![Step::for_each(
                ITEM,
                vec![
                    Step::read_text(nth(ITEM_NAME), "itemName@{index}"),
                    Step::click(nth(ITEM_BUTTON)),
                    Step::click(CART_LINK),
                    Step::assert_url(page(config, CART_PAGE)),
                    Step::assert_text(nth(ITEM_NAME), Expected::recall("itemName@{index}")),
                    Step::GoBack,
                    Step::assert_url(page(config, INVENTORY_PAGE)),
                ],
            )],
        ))
        .scenario(Scenario::placeholder(
            "cart enforces its maximum number of products",
        ))
}

/// Purchase completion (not yet written)
#[must_use]
pub fn checkout() -> ScenarioGroup {
    ScenarioGroup::new("checkout")
        .scenario(Scenario::placeholder("checkout flow completes"))
        .scenario(Scenario::placeholder("payment methods are processed"))
        .scenario(Scenario::placeholder(
            "summary and receipt list the selected products",
        ))
}

/// User accounts (not yet written)
#[must_use]
pub fn account() -> ScenarioGroup {
    ScenarioGroup::new("account")
        .scenario(Scenario::placeholder("creates a new account"))
        .scenario(Scenario::placeholder("stores the provided account data"))
        .scenario(Scenario::placeholder("saves edits to account information"))
}
