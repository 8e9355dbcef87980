#![allow(clippy::too_many_arguments)]

pub use IBridge::{IBridgeErrors as BridgeError, IBridgeEvents as BridgeEvent};
pub use IGovernance::{IGovernanceErrors as GovernanceError, IGovernanceEvents as GovernanceEvent};

// Governance authorizes against the bridge's validator set, so both interfaces share
// the descriptor types and must be declared in the same block.
alloy_sol_types::sol! {
    /// Validator set descriptor submitted alongside every authorized call.
    ///
    /// `validators[i]` holds `powers[i]`; the descriptor hashes into the checkpoint
    /// stored on chain.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct ValidatorSetArgs {
        address[] validators;
        uint256[] powers;
        uint256 nonce;
    }

    /// ECDSA signature positioned at the index of the validator it signs for.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct Signature {
        bytes32 r;
        bytes32 s;
        uint8 v;
    }

    /// Bridge between Ethereum and Namada.
    ///
    /// Holds the checkpoint of the validator set that attests transfers, the pending
    /// checkpoint written by governance, the inbound batch nonce and the token whitelist.
    #[derive(Debug, PartialEq, Eq)]
    interface IBridge {
        /// Inbound transfer disclosed from a signed batch. `from` is the token contract.
        struct Erc20Transfer {
            address from;
            address to;
            uint256 amount;
            address feeFrom;
            uint256 fee;
        }

        /// Outbound transfer to a Namada address. `from` is the token contract.
        struct NamadaTransfer {
            address from;
            string to;
            uint256 amount;
        }

        // --- Accessors ---
        function currentValidatorSetHash() external view returns (bytes32);
        function validatorSetNonce() external view returns (uint256);
        function nextValidatorSetHash() external view returns (bytes32);
        function batchNonce() external view returns (uint256);
        function transferToNamadaNonce() external view returns (uint256);
        function tokenWhitelistAmount(address token) external view returns (uint256);

        /// Returns whether `signatures` carry enough power of the current set over `messageHash`.
        function authorize(
            ValidatorSetArgs validatorSetArgs,
            Signature[] signatures,
            bytes32 messageHash
        ) external view returns (bool);

        // --- Validator set rotation ---
        function updateValidatorSet(
            ValidatorSetArgs currentValidatorSetArgs,
            ValidatorSetArgs newValidatorSetArgs,
            Signature[] signatures
        ) external;

        // --- Governance hooks ---
        function updateNextValidatorSetHash(bytes32 nextValidatorSetHash) external;
        function updateTokenWhitelist(address[] tokens, uint256[] tokensCap) external;
        function withdraw(address[] tokens, address to) external;

        // --- Ethereum <- Namada ---
        /// Settles the disclosed subset of a signed Merkle batch.
        function transferToERC(
            ValidatorSetArgs validatorSetArgs,
            Signature[] signatures,
            Erc20Transfer[] transfers,
            bytes32 poolRoot,
            bytes32[] proof,
            bool[] proofFlags,
            uint256 batchNonce
        ) external;

        /// Settles a signed batch passed as flat arrays.
        function batchTransferToERC(
            ValidatorSetArgs validatorSetArgs,
            Signature[] signatures,
            address[] froms,
            address[] tos,
            uint256[] amounts,
            uint256 batchNonce
        ) external;

        // --- Ethereum -> Namada ---
        function transferToNamada(NamadaTransfer[] transfers, uint256 confirmations) external;

        // --- Events ---
        event ValidatorSetUpdate(uint256 indexed validatorSetNonce, bytes32 validatorSetHash);
        event NextValidatorSetUpdate(bytes32 nextValidatorSetHash);
        event WhitelistUpdate(address indexed token, uint256 cap);
        event TransferToERC(uint256 indexed nonce, Erc20Transfer[] transfers);
        event TransferToNamada(
            uint256 indexed nonce,
            NamadaTransfer[] transfers,
            uint256 confirmations
        );

        // --- Errors ---
        error AlreadyInitialized();
        error MismatchArrayLength();
        error InvalidValidatorSetHash();
        error InvalidValidatorSetNonce();
        error InvalidNextValidatorSetHash();
        error InvalidVotingPowerThreshold();
        error NotEnoughVotingPower();
        error InvalidValidatorSetSignature();
        error InvalidTokenWhitelist();
        error InvalidBatchNonce();
        error InvalidBatch();
        error InvalidTransfersProof();
        error InvalidCaller();
        error InvalidAddress();
        error InvalidVersion();
    }

    /// Governance of the bridge.
    ///
    /// Owns its own validator set and is the only account allowed to rotate the bridge's
    /// pending validator set, change the whitelist, upgrade registered contracts and sweep
    /// custody.
    #[derive(Debug, PartialEq, Eq)]
    interface IGovernance {
        function validatorSetHash() external view returns (bytes32);
        function validatorSetNonce() external view returns (uint256);
        function withdrawNonce() external view returns (uint256);
        function whitelistNonce() external view returns (uint256);

        /// Same as `IBridge.authorize`, against the governance validator set.
        function authorize(
            ValidatorSetArgs validatorSetArgs,
            Signature[] signatures,
            bytes32 messageHash
        ) external view returns (bool);

        function updateValidatorsSet(
            ValidatorSetArgs currentValidatorSetArgs,
            bytes32 bridgeValidatorSetHash,
            bytes32 governanceValidatorSetHash,
            Signature[] signatures
        ) external;

        function upgradeContract(
            ValidatorSetArgs validators,
            Signature[] signatures,
            string name,
            address addr
        ) external;

        function addContract(
            ValidatorSetArgs validators,
            Signature[] signatures,
            string name,
            address addr
        ) external;

        function upgradeBridgeContract(
            ValidatorSetArgs validators,
            Signature[] signatures,
            address[] tokens,
            address addr
        ) external;

        function withdraw(
            ValidatorSetArgs validators,
            Signature[] signatures,
            address[] tokens,
            address to
        ) external;

        function updateBridgeWhitelist(
            ValidatorSetArgs validators,
            address[] tokens,
            uint256[] tokensCap,
            Signature[] signatures
        ) external;

        // --- Events ---
        event ValidatorSetUpdate(
            uint256 indexed validatorSetNonce,
            bytes32 bridgeValidatorSetHash,
            bytes32 governanceValidatorSetHash
        );
        event ContractUpgraded(string name, address addr);
        event ContractAdded(string name, address addr);
        event Withdraw(uint256 indexed withdrawNonce, address to, address[] tokens);
        event BridgeWhitelistUpdate(
            uint256 indexed whitelistNonce,
            address[] tokens,
            uint256[] tokensCap
        );

        // --- Errors ---
        error AlreadyInitialized();
        error Unauthorized();
        error MalformedInput();
        error InvalidAddress();
        error InvalidContractName();
        error InvalidValidatorSetHash();
        error InvalidVotingPowerThreshold();
        error InvalidVersion();
    }
}
