pub use IVault::IVaultErrors as VaultError;

alloy_sol_types::sol! {
    /// Custody of the tokens bridged to Namada.
    #[derive(Debug, PartialEq, Eq)]
    interface IVault {
        struct VaultTransfer {
            address token;
            address to;
            uint256 amount;
        }

        /// Pays out settled transfers. Only callable by the registered bridge.
        function batchTransferToERC20(VaultTransfer[] transfers) external;

        /// Sweeps the full balance of each token to `to`. Only callable by governance.
        function withdraw(address[] tokens, address to) external;

        error InvalidCaller();
        error InvalidAddress();
        error AlreadyInitialized();
    }
}
