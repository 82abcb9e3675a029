//! Voucher Rule Engine
//!
//! Stateless, ordered validation of a voucher against a user/cart context.
//! Each check short-circuits with a distinct [`ErrorCode`]; an invalid
//! voucher is an expected outcome carried as a value, never an `Err`.
//! Only storage failure is an error.

use crate::db::repository::{voucher, voucher_usage, RepoResult};
use crate::vouchers::discount::{self, DiscountBreakdown};
use shared::models::Voucher;
use shared::util::now_millis;
use shared::ErrorCode;
use sqlx::SqlitePool;

/// One cart line as seen by the engine. Category comes from the catalog
/// collaborator, snapshotted by the caller.
#[derive(Debug, Clone, Copy)]
pub struct CartLine {
    pub product_id: i64,
    pub category_id: i64,
    pub quantity: i64,
}

/// Everything a validation run needs about the buyer and the cart
#[derive(Debug, Clone)]
pub struct ValidationContext {
    pub user_id: i64,
    /// Account creation time from the identity collaborator, for
    /// new-user-only vouchers
    pub account_created_at: i64,
    pub lines: Vec<CartLine>,
    /// Goods subtotal, shipping excluded
    pub order_amount: i64,
    pub shipping_fee: i64,
    /// Vouchers already applied in this checkout, for stacking rules
    pub applied: Vec<Voucher>,
}

impl ValidationContext {
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

/// Validation switches
#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    /// Checkout correlation ref of a reservation this user already holds.
    /// When the ref matches a live PENDING record for (user, voucher),
    /// the per-user checks are skipped so a voucher being re-applied to
    /// the same cart does not block itself.
    pub reapplication_ref: Option<String>,
}

/// Validation outcome
#[derive(Debug, Clone)]
pub enum Validation {
    Valid {
        voucher: Voucher,
        preview: DiscountBreakdown,
    },
    Invalid {
        code: ErrorCode,
        message: String,
    },
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid { .. })
    }

    fn invalid(code: ErrorCode) -> Self {
        Validation::Invalid {
            message: code.message().to_string(),
            code,
        }
    }
}

/// Run the ordered checks for `code` against the context.
///
/// Check order: existence, active/window, capacity, minimum spend, user
/// eligibility, product/category applicability, cart quantity bounds,
/// stacking. The first failure wins.
pub async fn validate(
    pool: &SqlitePool,
    code: &str,
    ctx: &ValidationContext,
    options: &ValidationOptions,
) -> RepoResult<Validation> {
    let Some(v) = voucher::find_by_code(pool, code).await? else {
        return Ok(Validation::invalid(ErrorCode::NotFound));
    };

    let now = now_millis();
    if !v.is_active {
        return Ok(Validation::invalid(ErrorCode::Inactive));
    }
    if now < v.valid_from {
        return Ok(Validation::invalid(ErrorCode::NotStarted));
    }
    if now > v.valid_to {
        return Ok(Validation::invalid(ErrorCode::Expired));
    }

    if v.remaining() <= 0 {
        return Ok(Validation::invalid(ErrorCode::OutOfStock));
    }

    if ctx.order_amount < v.min_order_amount {
        return Ok(Validation::invalid(ErrorCode::MinOrderNotMet));
    }

    if let Some(invalid) = check_user_eligibility(pool, &v, ctx, options).await? {
        return Ok(invalid);
    }

    if let Some(invalid) = check_cart_applicability(&v, ctx) {
        return Ok(invalid);
    }

    if let Some(invalid) = check_stacking(&v, ctx) {
        return Ok(invalid);
    }

    let preview = discount::calculate(&v, ctx.order_amount, ctx.shipping_fee);
    tracing::debug!(
        voucher = %v.code,
        user_id = ctx.user_id,
        discount = preview.discount_amount,
        "Voucher validated"
    );
    Ok(Validation::Valid { voucher: v, preview })
}

async fn check_user_eligibility(
    pool: &SqlitePool,
    v: &Voucher,
    ctx: &ValidationContext,
    options: &ValidationOptions,
) -> RepoResult<Option<Validation>> {
    if !v.applicable_users.is_empty() && !v.applicable_users.contains(&ctx.user_id) {
        return Ok(Some(Validation::invalid(ErrorCode::UserNotEligible)));
    }

    // New-user-only compares account age to the voucher launch, so the
    // promotion targets accounts created during its campaign.
    if v.new_user_only && ctx.account_created_at < v.valid_from {
        return Ok(Some(Validation::invalid(ErrorCode::NewUserOnly)));
    }

    // A live reservation for the same checkout must not block its own
    // re-validation through the history checks below.
    if let Some(r) = &options.reapplication_ref {
        if voucher_usage::find_pending_by_ref(pool, v.id, ctx.user_id, r)
            .await?
            .is_some()
        {
            return Ok(None);
        }
    }

    if v.first_use_only && voucher_usage::has_used(pool, v.id, ctx.user_id).await? {
        return Ok(Some(Validation::invalid(ErrorCode::FirstTimeOnly)));
    }

    // PENDING reservations count toward the cap until committed, rolled
    // back, or swept.
    let active = voucher_usage::count_active_for_user(pool, v.id, ctx.user_id).await?;
    if active >= v.per_user_limit {
        return Ok(Some(Validation::invalid(ErrorCode::UserLimitExceeded)));
    }

    Ok(None)
}

fn check_cart_applicability(v: &Voucher, ctx: &ValidationContext) -> Option<Validation> {
    if !v.applicable_products.is_empty()
        && !ctx
            .lines
            .iter()
            .any(|l| v.applicable_products.contains(&l.product_id))
    {
        return Some(Validation::invalid(ErrorCode::ProductNotApplicable));
    }
    if ctx
        .lines
        .iter()
        .any(|l| v.excluded_products.contains(&l.product_id))
    {
        return Some(Validation::invalid(ErrorCode::ProductExcluded));
    }
    if !v.applicable_categories.is_empty()
        && !ctx
            .lines
            .iter()
            .any(|l| v.applicable_categories.contains(&l.category_id))
    {
        return Some(Validation::invalid(ErrorCode::CategoryNotApplicable));
    }
    if ctx
        .lines
        .iter()
        .any(|l| v.excluded_categories.contains(&l.category_id))
    {
        return Some(Validation::invalid(ErrorCode::CategoryExcluded));
    }

    let quantity = ctx.total_quantity();
    if let Some(min) = v.min_cart_quantity {
        if quantity < min {
            return Some(Validation::invalid(ErrorCode::MinQuantityNotMet));
        }
    }
    if let Some(max) = v.max_cart_quantity {
        if quantity > max {
            return Some(Validation::invalid(ErrorCode::MaxQuantityExceeded));
        }
    }
    None
}

fn check_stacking(v: &Voucher, ctx: &ValidationContext) -> Option<Validation> {
    if ctx.applied.is_empty() {
        return None;
    }
    // Two shipping waivers cannot combine
    if v.voucher_type == shared::models::VoucherType::FreeShipping
        && ctx
            .applied
            .iter()
            .any(|a| a.voucher_type == shared::models::VoucherType::FreeShipping)
    {
        return Some(Validation::invalid(ErrorCode::ConflictWithExisting));
    }
    if !v.is_stackable || ctx.applied.iter().any(|a| !a.is_stackable) {
        return Some(Validation::invalid(ErrorCode::StackingNotAllowed));
    }
    None
}
