//! Method classification.
//!
//! Local:       answered synchronously from provider state
//! Host:        forwarded to the wallet host over the message channel
//! Unsupported: rejected immediately (filters, subscriptions)
//! Upstream:    everything else, forwarded to the JSON-RPC node

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handler tag of an outbound host message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HostHandler {
    SignPersonalMessage,
    SignMessage,
    EcRecover,
    SignTypedMessage,
    SignTransaction,
    RequestAccounts,
    WatchAsset,
    AddEthereumChain,
}

impl HostHandler {
    pub const ALL: [HostHandler; 8] = [
        HostHandler::SignPersonalMessage,
        HostHandler::SignMessage,
        HostHandler::EcRecover,
        HostHandler::SignTypedMessage,
        HostHandler::SignTransaction,
        HostHandler::RequestAccounts,
        HostHandler::WatchAsset,
        HostHandler::AddEthereumChain,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            HostHandler::SignPersonalMessage => "signPersonalMessage",
            HostHandler::SignMessage => "signMessage",
            HostHandler::EcRecover => "ecRecover",
            HostHandler::SignTypedMessage => "signTypedMessage",
            HostHandler::SignTransaction => "signTransaction",
            HostHandler::RequestAccounts => "requestAccounts",
            HostHandler::WatchAsset => "watchAsset",
            HostHandler::AddEthereumChain => "addEthereumChain",
        }
    }

    /// Whether the handler may be used before an address is known.
    pub const fn allowed_before_ready(&self) -> bool {
        matches!(self, HostHandler::RequestAccounts)
    }
}

impl fmt::Display for HostHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// EIP-712 hashing variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypedDataVersion {
    V3,
    V4,
}

/// Dispatch class of a method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    Local,
    Host(HostHandler),
    Unsupported,
    Upstream,
}

/// Every method the router recognizes, plus a fallback.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RpcMethod {
    Accounts,
    Coinbase,
    NetVersion,
    ChainId,
    Sign,
    PersonalSign,
    PersonalEcRecover,
    SignTypedData,
    SignTypedDataV3,
    SignTypedDataV4,
    SendTransaction,
    RequestAccounts,
    WatchAsset,
    AddEthereumChain,
    NewFilter,
    NewBlockFilter,
    NewPendingTransactionFilter,
    UninstallFilter,
    Subscribe,
    /// Not handled locally or by the host; forwarded upstream verbatim
    Other(String),
}

impl RpcMethod {
    pub fn parse(method: &str) -> Self {
        match method {
            "eth_accounts" => RpcMethod::Accounts,
            "eth_coinbase" => RpcMethod::Coinbase,
            "net_version" => RpcMethod::NetVersion,
            "eth_chainId" => RpcMethod::ChainId,
            "eth_sign" => RpcMethod::Sign,
            "personal_sign" => RpcMethod::PersonalSign,
            "personal_ecRecover" => RpcMethod::PersonalEcRecover,
            "eth_signTypedData" => RpcMethod::SignTypedData,
            "eth_signTypedData_v3" => RpcMethod::SignTypedDataV3,
            "eth_signTypedData_v4" => RpcMethod::SignTypedDataV4,
            "eth_sendTransaction" => RpcMethod::SendTransaction,
            "eth_requestAccounts" => RpcMethod::RequestAccounts,
            "wallet_watchAsset" => RpcMethod::WatchAsset,
            "wallet_addEthereumChain" => RpcMethod::AddEthereumChain,
            "eth_newFilter" => RpcMethod::NewFilter,
            "eth_newBlockFilter" => RpcMethod::NewBlockFilter,
            "eth_newPendingTransactionFilter" => RpcMethod::NewPendingTransactionFilter,
            "eth_uninstallFilter" => RpcMethod::UninstallFilter,
            "eth_subscribe" => RpcMethod::Subscribe,
            other => RpcMethod::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RpcMethod::Accounts => "eth_accounts",
            RpcMethod::Coinbase => "eth_coinbase",
            RpcMethod::NetVersion => "net_version",
            RpcMethod::ChainId => "eth_chainId",
            RpcMethod::Sign => "eth_sign",
            RpcMethod::PersonalSign => "personal_sign",
            RpcMethod::PersonalEcRecover => "personal_ecRecover",
            RpcMethod::SignTypedData => "eth_signTypedData",
            RpcMethod::SignTypedDataV3 => "eth_signTypedData_v3",
            RpcMethod::SignTypedDataV4 => "eth_signTypedData_v4",
            RpcMethod::SendTransaction => "eth_sendTransaction",
            RpcMethod::RequestAccounts => "eth_requestAccounts",
            RpcMethod::WatchAsset => "wallet_watchAsset",
            RpcMethod::AddEthereumChain => "wallet_addEthereumChain",
            RpcMethod::NewFilter => "eth_newFilter",
            RpcMethod::NewBlockFilter => "eth_newBlockFilter",
            RpcMethod::NewPendingTransactionFilter => "eth_newPendingTransactionFilter",
            RpcMethod::UninstallFilter => "eth_uninstallFilter",
            RpcMethod::Subscribe => "eth_subscribe",
            RpcMethod::Other(name) => name,
        }
    }

    pub fn kind(&self) -> MethodKind {
        match self {
            RpcMethod::Accounts
            | RpcMethod::Coinbase
            | RpcMethod::NetVersion
            | RpcMethod::ChainId => MethodKind::Local,
            // eth_sign picks between two handlers once the payload is inspected
            RpcMethod::Sign | RpcMethod::PersonalSign => {
                MethodKind::Host(HostHandler::SignPersonalMessage)
            }
            RpcMethod::PersonalEcRecover => MethodKind::Host(HostHandler::EcRecover),
            RpcMethod::SignTypedData | RpcMethod::SignTypedDataV3 | RpcMethod::SignTypedDataV4 => {
                MethodKind::Host(HostHandler::SignTypedMessage)
            }
            RpcMethod::SendTransaction => MethodKind::Host(HostHandler::SignTransaction),
            RpcMethod::RequestAccounts => MethodKind::Host(HostHandler::RequestAccounts),
            RpcMethod::WatchAsset => MethodKind::Host(HostHandler::WatchAsset),
            RpcMethod::AddEthereumChain => MethodKind::Host(HostHandler::AddEthereumChain),
            RpcMethod::NewFilter
            | RpcMethod::NewBlockFilter
            | RpcMethod::NewPendingTransactionFilter
            | RpcMethod::UninstallFilter
            | RpcMethod::Subscribe => MethodKind::Unsupported,
            RpcMethod::Other(_) => MethodKind::Upstream,
        }
    }

    /// Hashing variant for the typed-data signing methods.
    pub fn typed_data_version(&self) -> Option<TypedDataVersion> {
        match self {
            RpcMethod::SignTypedDataV3 => Some(TypedDataVersion::V3),
            RpcMethod::SignTypedData | RpcMethod::SignTypedDataV4 => Some(TypedDataVersion::V4),
            _ => None,
        }
    }

    pub fn is_local(&self) -> bool {
        self.kind() == MethodKind::Local
    }
}

impl fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
