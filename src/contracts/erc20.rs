//! ERC20 wager token bindings

use alloy::sol;

sol! {
    /// The subset of ERC20 the flip flow touches
    #[sol(rpc)]
    interface IERC20 {
        /// Returns the balance of an account
        function balanceOf(address account) external view returns (uint256);

        /// Returns the allowance of a spender
        function allowance(address owner, address spender) external view returns (uint256);

        /// Approves a spender to spend tokens
        function approve(address spender, uint256 amount) external returns (bool);
    }
}
