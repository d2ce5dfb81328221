//! Vault Settlement Core Simulation.
//!
//! Demonstrates the full asynchronous settlement lifecycle: redemption and
//! minting requests, executor callbacks, cancellation refunds, fallback
//! custody, and the account freeze window.

use rust_decimal_macros::dec;
use vault_settlement::*;

const OWNER: Address = Address(0x01);
const VAULT: Address = Address(0x07);
const HANDLER: Address = Address(0x42);
const VENUE_TOKEN: Address = Address(0xAE);
const WETH: Address = Address(0xEE);
const USDC: Address = Address(0xDC);

const VENUE_MARKET: MarketId = MarketId(1);
const WETH_MARKET: MarketId = MarketId(2);
const USDC_MARKET: MarketId = MarketId(3);

fn main() {
    println!("Vault Settlement Core Simulation");
    println!("Async mint/redeem, isolated sub-accounts, fallback custody\n");

    scenario_1_redemption_happy_path();
    scenario_2_cancellation();
    scenario_3_forward_failure_fallback();
    scenario_4_freeze_window();
    scenario_5_minting_round_trip();

    println!("\nAll simulations completed successfully.");
}

struct World {
    unwrapper: UnwrapperTrader,
    venue: VenueQueue,
    registry: VenueRegistry,
    ledger: InMemoryLedger,
    guard: FreezeGuard,
}

fn setup() -> World {
    let mut unwrapper = UnwrapperTrader::new(
        Address(0xAA),
        OWNER,
        VENUE_TOKEN,
        VENUE_MARKET,
        WETH,
        WETH_MARKET,
    );
    unwrapper
        .initialize(Address(0x10), Address(0x11), Address(0x12))
        .unwrap();

    let mut registry = VenueRegistry::new(Address(0x10), OWNER);
    registry.add_handler(OWNER, HANDLER).unwrap();

    let mut ledger = InMemoryLedger::new();
    ledger.credit_account(
        SubAccount::new(VAULT, AccountNumber(123)),
        VENUE_MARKET,
        Wei::new_unchecked(dec!(10_000_000_000_000_000_000)),
    );

    World {
        unwrapper,
        venue: VenueQueue::new(Address(0xBB), Wei::zero()),
        registry,
        ledger,
        guard: FreezeGuard::new(),
    }
}

fn redemption_request() -> UnwrapRequest {
    UnwrapRequest {
        vault: VAULT,
        account_number: AccountNumber(123),
        input_amount: Wei::new_unchecked(dec!(10_000_000_000_000_000_000)),
        output_token: WETH,
        min_output_amount: Wei::new_unchecked(dec!(1)),
        execution_fee: Wei::zero(),
    }
}

/// Redemption request fulfilled by the executor.
fn scenario_1_redemption_happy_path() {
    println!("Scenario 1: Redemption Happy Path\n");

    let mut w = setup();
    let acct = SubAccount::new(VAULT, AccountNumber(123));

    println!("  Vault holds 10e18 venue tokens in sub-account 123");

    let key = w
        .unwrapper
        .initiate_unwrapping(
            VAULT,
            redemption_request(),
            &mut w.venue,
            &mut w.ledger,
            &mut w.guard,
            Timestamp::from_millis(1000),
        )
        .unwrap();

    println!("  Request {} submitted, account frozen: {}", key, w.guard.is_frozen(acct));

    let executed = w.venue.resolve(key).unwrap();
    println!("  Venue redeemed {} tokens off-chain", executed.amount);
    let data = CallbackData::new()
        .with_address(OUTPUT_TOKEN_KEY, WETH)
        .with_uint(OUTPUT_AMOUNT_KEY, Wei::new_unchecked(dec!(9_970_000_000_000_000_000)));

    w.unwrapper
        .after_withdrawal_execution(
            HANDLER,
            key,
            &data,
            &w.registry,
            &mut w.ledger,
            &mut w.guard,
            Timestamp::from_millis(2000),
        )
        .unwrap();

    println!("  Executor settled 9.97e18 WETH");
    println!("  Account frozen: {}", w.guard.is_frozen(acct));
    println!("  WETH balance: {}", w.ledger.balance(acct, WETH_MARKET));
    println!("  Venue token balance: {}", w.ledger.balance(acct, VENUE_MARKET));
    println!("  Events emitted: {}\n", w.unwrapper.events().len());
}

/// Venue cancels the request; committed tokens restored.
fn scenario_2_cancellation() {
    println!("Scenario 2: Cancellation\n");

    let mut w = setup();
    let acct = SubAccount::new(VAULT, AccountNumber(123));

    let key = w
        .unwrapper
        .initiate_unwrapping(
            VAULT,
            redemption_request(),
            &mut w.venue,
            &mut w.ledger,
            &mut w.guard,
            Timestamp::from_millis(1000),
        )
        .unwrap();

    println!("  Request {} submitted", key);

    let cancelled = w.venue.resolve(key).unwrap();
    println!("  Venue dropped request for {} tokens", cancelled.amount);
    w.unwrapper
        .after_withdrawal_cancellation(
            HANDLER,
            key,
            &CallbackData::new(),
            &w.registry,
            &w.venue,
            &mut w.ledger,
            &mut w.guard,
            Timestamp::from_millis(2000),
        )
        .unwrap();

    println!("  Executor cancelled (stale price bound)");
    println!("  Account frozen: {}", w.guard.is_frozen(acct));
    println!("  Venue token balance restored: {}", w.ledger.balance(acct, VENUE_MARKET));
    println!("  WETH balance unchanged: {}\n", w.ledger.balance(acct, WETH_MARKET));
}

/// The vault's deposit hook rejects the forward; trader retains custody.
fn scenario_3_forward_failure_fallback() {
    println!("Scenario 3: Forward Failure Fallback\n");

    let mut w = setup();
    let acct = SubAccount::new(VAULT, AccountNumber(123));

    w.ledger
        .install_hook(VAULT, Box::new(RejectingHook::with_reason("boom")));

    let key = w
        .unwrapper
        .initiate_unwrapping(
            VAULT,
            redemption_request(),
            &mut w.venue,
            &mut w.ledger,
            &mut w.guard,
            Timestamp::from_millis(1000),
        )
        .unwrap();

    let data = CallbackData::new()
        .with_address(OUTPUT_TOKEN_KEY, WETH)
        .with_uint(OUTPUT_AMOUNT_KEY, Wei::new_unchecked(dec!(9_970_000_000_000_000_000)));

    w.unwrapper
        .after_withdrawal_execution(
            HANDLER,
            key,
            &data,
            &w.registry,
            &mut w.ledger,
            &mut w.guard,
            Timestamp::from_millis(2000),
        )
        .unwrap();

    let retained = w.unwrapper.retained(key).unwrap();
    println!("  Forward rejected by hook, reason: '{}'", retained.reason);
    println!("  Account frozen: {}", w.guard.is_frozen(acct));
    println!("  Vault WETH balance: {}", w.ledger.balance(acct, WETH_MARKET));
    println!(
        "  Trader wallet WETH: {}",
        w.ledger.wallet_balance(w.unwrapper.address(), WETH_MARKET)
    );

    let swept = w
        .unwrapper
        .sweep_retained(OWNER, key, Address(0xCC), &mut w.ledger, Timestamp::from_millis(3000))
        .unwrap();
    println!("  Owner swept {} to receiver\n", swept);
}

/// Margin operations on a frozen sub-account are rejected until settlement.
fn scenario_4_freeze_window() {
    println!("Scenario 4: Freeze Window\n");

    let mut w = setup();
    let acct = SubAccount::new(VAULT, AccountNumber(123));
    let sibling = SubAccount::new(VAULT, AccountNumber(124));
    w.ledger
        .credit_account(sibling, VENUE_MARKET, Wei::new_unchecked(dec!(1_000)));

    let key = w
        .unwrapper
        .initiate_unwrapping(
            VAULT,
            redemption_request(),
            &mut w.venue,
            &mut w.ledger,
            &mut w.guard,
            Timestamp::from_millis(1000),
        )
        .unwrap();

    let withdraw = vec![ActionArgs::withdraw(
        0,
        Address(0xCC),
        VENUE_MARKET,
        Wei::new_unchecked(dec!(1)),
    )];
    let frozen_result = w.ledger.operate(&[acct], &withdraw, &w.guard);
    println!("  Withdraw on frozen sub-account: {:?}", frozen_result.unwrap_err());

    let sibling_result = w.ledger.operate(&[sibling], &withdraw, &w.guard);
    println!("  Same vault, sub-account 124: {:?}", sibling_result.is_ok());

    w.unwrapper
        .after_withdrawal_cancellation(
            HANDLER,
            key,
            &CallbackData::new(),
            &w.registry,
            &w.venue,
            &mut w.ledger,
            &mut w.guard,
            Timestamp::from_millis(2000),
        )
        .unwrap();

    let thawed_result = w.ledger.operate(&[acct], &withdraw, &w.guard);
    println!("  After cancellation, withdraw succeeds: {}\n", thawed_result.is_ok());
}

/// Minting direction: USDC committed, venue tokens forwarded back.
fn scenario_5_minting_round_trip() {
    println!("Scenario 5: Minting Round Trip\n");

    let mut wrapper = WrapperTrader::new(
        Address(0xAB),
        OWNER,
        USDC,
        USDC_MARKET,
        VENUE_TOKEN,
        VENUE_MARKET,
    );
    wrapper
        .initialize(Address(0x10), Address(0x11), Address(0x12))
        .unwrap();

    let mut registry = VenueRegistry::new(Address(0x10), OWNER);
    registry.add_handler(OWNER, HANDLER).unwrap();
    let mut venue = VenueQueue::new(Address(0xBB), Wei::new_unchecked(dec!(2)));
    let mut ledger = InMemoryLedger::new();
    let mut guard = FreezeGuard::new();

    let acct = SubAccount::new(VAULT, AccountNumber(5));
    ledger.credit_account(acct, USDC_MARKET, Wei::new_unchecked(dec!(50_000)));

    let key = wrapper
        .initiate_wrapping(
            VAULT,
            WrapRequest {
                vault: VAULT,
                account_number: AccountNumber(5),
                input_amount: Wei::new_unchecked(dec!(50_000)),
                output_token: VENUE_TOKEN,
                min_output_amount: Wei::new_unchecked(dec!(49_000)),
                execution_fee: Wei::new_unchecked(dec!(2)),
            },
            &mut venue,
            &mut ledger,
            &mut guard,
            Timestamp::from_millis(1000),
        )
        .unwrap();

    println!("  Committed 50,000 USDC to the mint queue, key {}", key);
    println!("  Fee escrow: {}", wrapper.fee_escrow());

    let data = CallbackData::new()
        .with_address(OUTPUT_TOKEN_KEY, VENUE_TOKEN)
        .with_uint(OUTPUT_AMOUNT_KEY, Wei::new_unchecked(dec!(49_800)));

    wrapper
        .after_deposit_execution(
            HANDLER,
            key,
            &data,
            &registry,
            &mut ledger,
            &mut guard,
            Timestamp::from_millis(2000),
        )
        .unwrap();

    println!("  Minted 49,800 venue tokens into sub-account 5");
    println!("  Venue token balance: {}", ledger.balance(acct, VENUE_MARKET));

    let swept = wrapper
        .withdraw_native_asset(OWNER, Address(0xCC), Timestamp::from_millis(3000))
        .unwrap();
    println!("  Owner swept {} native asset from fee escrow", swept);
}
