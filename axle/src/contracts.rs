//! ABI definitions for the order-book contract deployed on spoke chains and
//! the order-ledger contract deployed on the hub chain.

use alloy::sol;

sol! {
    /// Emitted by a spoke order book when a new cross-chain order is placed.
    #[derive(Debug, PartialEq, Eq)]
    event OrderCreated(
        bytes32 indexed id,
        uint256 destination,
        address asset,
        bytes32 targetAccount,
        uint256 amount,
        address rewardAsset,
        uint256 insurance,
        uint256 maxReward,
        uint256 nonce,
        address sourceAccount,
        uint256 orderTimestamp
    );

    /// Emitted by a spoke order book when a filler settles an order on the
    /// destination chain.
    #[derive(Debug, PartialEq, Eq)]
    event Confirmation(
        bytes32 indexed id,
        bytes32 target,
        uint256 amount,
        address asset,
        address sender,
        bytes32 confirmationId,
        uint256 timestamp
    );

    /// Emitted by the hub order ledger once a creation proof is accepted.
    #[derive(Debug, PartialEq, Eq)]
    event OrderOpened(bytes32 indexed id);

    /// Emitted by the hub order ledger once a confirmation proof is accepted.
    #[derive(Debug, PartialEq, Eq)]
    event OrderCompleted(bytes32 indexed id, bytes32 confirmationId);

    /// Emitted alongside [`OrderCompleted`]; signals that the filler may
    /// reclaim the reward on the hub chain.
    #[derive(Debug, PartialEq, Eq)]
    event ReclaimReady(bytes32 indexed id, address sourceAccount, address rewardAsset);

    function openOrder(bytes proof);
    function orderCompleted(bytes proof);
}
