pub use IHub::{IHubErrors as HubError, IHubEvents as HubEvent};

alloy_sol_types::sol! {
    /// Name to address registry of the bridge contracts.
    ///
    /// Until `completeContractInit` the owner edits the registry; afterwards only the
    /// contract registered as `governance` may.
    #[derive(Debug, PartialEq, Eq)]
    interface IHub {
        function owner() external view returns (address);
        function initialized() external view returns (bool);
        function getContract(string name) external view returns (address);

        function addContract(string name, address addr) external;
        function upgradeContract(string name, address addr) external;
        function completeContractInit() external;

        event ContractAdded(string name, address addr);
        event ContractUpgraded(string name, address previous, address addr);
        event ContractInitCompleted(address governance);

        error AlreadyInitialized();
        error CallerIsNotOwner();
        error InvalidCallerAddress();
        error ContractNameAlreadyExist();
        error InvalidDuplicateAddress();
        error InvalidContractAddress();
        error InvalidAddress();
        error AddressMustBeDifferent();
        error GovernanceContractMustBeSet();
    }
}
