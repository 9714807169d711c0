pub mod accounts;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod errors;
pub mod pricing;

pub use accounts::CredentialHasher;
pub use cart::{Cart, CartTotals, ShippingCharge};
pub use catalog::{CatalogFacets, CatalogQueryEngine, FilterSpec, Page, SearchParams, SortBy};
pub use checkout::{
    CheckoutRequest, CouponBook, OrderDraft, OrderStamp, PostalCodeShippingQuoter,
    ShippingQuoter, StaticCouponBook,
};
pub use domain::cart::{CartItem, Coupon};
pub use domain::customer::{Customer, CustomerId};
pub use domain::order::{IdempotencyKey, Order, OrderId, OrderStatus};
pub use domain::product::{Product, ProductId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use pricing::{PricingResult, PricingTrace};
