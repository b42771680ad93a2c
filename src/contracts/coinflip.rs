//! Coin flip wager contract bindings

use alloy::sol;

sol! {
    /// Coin flip game interface
    #[sol(rpc)]
    interface ICoinFlip {
        /// Fund the treasury that pays out winning bets
        function depositERC20(address token, uint256 amount) external;

        /// Place a bet; `face` is true for heads. Pulls `amount` via allowance
        function flip(bool face, address token, uint256 amount) external returns (uint256 requestId);

        /// Whether a bet exists and whether its randomness has been fulfilled
        function getBetStatus(uint256 requestId) external view returns (bool exists, bool fulfilled);

        /// Settled result of a bet
        function getGameOutcome(uint256 requestId)
            external
            view
            returns (bool face, bool won, uint256 payout);

        /// Emitted when a bet is accepted and randomness requested
        event BetSent(
            uint256 indexed requestId,
            address indexed player,
            bool face,
            address token,
            uint256 amount
        );
    }
}
