pub use IToken::{ITokenErrors as TokenError, ITokenEvents as TokenEvent};

alloy_sol_types::sol! {
    /// Minimal ERC-20 used for bridged assets.
    #[derive(Debug, PartialEq, Eq)]
    interface IToken {
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
        function approve(address spender, uint256 amount) external returns (bool);
        function transferFrom(address from, address to, uint256 amount) external returns (bool);

        event Transfer(address indexed from, address indexed to, uint256 amount);
        event Approval(address indexed owner, address indexed spender, uint256 amount);

        error InsufficientBalance(uint256 available, uint256 required);
        error InsufficientAllowance();
        error InvalidRecipient();
    }
}
