//! Endpoint paths and fixed protocol values.

/// OAuth server discovery document, relative to the server URL.
pub const DISCOVERY_PATH: &str = "/Server/OAuthServerDiscovery.aspx";

/// Suffix appended to the provider URI to fetch its OpenID configuration.
///
/// The provider URI returned by discovery ends with `/`, so this is
/// concatenated without a separator.
pub const OPENID_CONFIGURATION_SUFFIX: &str = ".well-known/openid-configuration";

/// Opens a vault transaction.
pub const BEGIN_TRANSACTION_PATH: &str = "/vault/odata/vault.BeginTransaction";

/// Uploads one byte range of a file into the open transaction.
pub const UPLOAD_FILE_PATH: &str = "/vault/odata/vault.UploadFile";

/// Commits the transaction and registers the file item.
pub const COMMIT_TRANSACTION_PATH: &str = "/vault/odata/vault.CommitTransaction";

/// Path of the embedded request inside the commit batch body.
pub const FILE_ENTITY_PATH: &str = "/Server/odata/File";

/// OAuth scope requested in the password grant.
pub const DEFAULT_SCOPE: &str = "Innovator";

/// OAuth client id used for the password grant.
pub const DEFAULT_CLIENT_ID: &str = "IOMApp";

/// `related_id` of the `Located` relationship written on commit.
pub const LOCATED_RELATED_ID: &str = "67BBB9204FE84A8981ED8313049BA06C";

/// Version recorded on the `Located` relationship.
pub const LOCATED_FILE_VERSION: u32 = 1;

/// Prefix of the multipart boundary used by the commit body.
pub const BOUNDARY_PREFIX: &str = "batch_";

/// Header carrying the transaction id on upload and commit calls.
pub const TRANSACTION_ID_HEADER: &str = "transactionid";

/// Line terminator of the commit body. LF alone breaks the server's parser.
pub const CRLF: &str = "\r\n";
