//! Event name constants. These strings are routing keys on the wire; never
//! change an existing value.

pub const EVENT_CANDLE_PARAM: &str = "event.candle_param";
pub const EVENT_CANDLE: &str = "event.candle";
pub const EVENT_TICKER: &str = "event.ticker";
pub const EVENT_ORDER: &str = "event.order";
pub const EVENT_ORDER_CANCEL_ALL: &str = "event.order_cancel_all";
pub const EVENT_ORDER_CANCEL: &str = "event.order_cancel";
/// Public market trades.
pub const EVENT_TRADES: &str = "event.trades";
pub const EVENT_TRADE_ACTION: &str = "event.trade_action";
/// Our own fills.
pub const EVENT_TRADE: &str = "event.trade";
pub const EVENT_POSITION: &str = "event.position";
/// Position held by the current runner only.
pub const EVENT_CUR_POSITION: &str = "event.cur_position";
pub const EVENT_RISK_LIMIT: &str = "event.risk_limit";
pub const EVENT_DEPTH: &str = "event.depth";
pub const EVENT_ACCOUNT: &str = "event.balance";
pub const EVENT_ACTION: &str = "event.action";
pub const EVENT_WATCH: &str = "event.watch";
pub const EVENT_NOTIFY: &str = "event.notify";

/// Every standard name, in registration order.
pub const ALL: [&str; 17] = [
    EVENT_CANDLE_PARAM,
    EVENT_CANDLE,
    EVENT_TICKER,
    EVENT_ORDER,
    EVENT_ORDER_CANCEL_ALL,
    EVENT_ORDER_CANCEL,
    EVENT_TRADES,
    EVENT_TRADE_ACTION,
    EVENT_TRADE,
    EVENT_POSITION,
    EVENT_CUR_POSITION,
    EVENT_RISK_LIMIT,
    EVENT_DEPTH,
    EVENT_ACCOUNT,
    EVENT_ACTION,
    EVENT_WATCH,
    EVENT_NOTIFY,
];
