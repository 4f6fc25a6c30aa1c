/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id hashing and the stored-credential representation
///
/// Sessions and tokens are not issued; a successful login simply returns the
/// user's ID and display name.

pub mod password;
