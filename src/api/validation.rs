use super::ApiError;

pub fn validate_listing_id(id: &str) -> Result<&str, ApiError> {
    let trimmed = id.trim();

    if trimmed.is_empty() {
        return Err(ApiError::validation("Listing ID cannot be empty"));
    }

    if trimmed.len() > 64 {
        return Err(ApiError::validation(
            "Listing ID must be 64 characters or less",
        ));
    }

    Ok(trimmed)
}

pub fn validate_listing_name(name: &str) -> Result<&str, ApiError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ApiError::validation("Listing name cannot be empty"));
    }

    if trimmed.len() > 100 {
        return Err(ApiError::validation(
            "Listing name must be 100 characters or less",
        ));
    }

    Ok(trimmed)
}

pub fn validate_search_query(query: &str) -> Result<&str, ApiError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Search query cannot be empty"));
    }
    Ok(trimmed)
}

pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(ApiError::validation("Username cannot be empty"));
    }

    if trimmed.len() > 50 {
        return Err(ApiError::validation(
            "Username must be 50 characters or less",
        ));
    }

    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ApiError::validation(
            "Username can only contain letters, numbers, hyphens, underscores, and dots",
        ));
    }

    Ok(trimmed)
}

pub fn validate_password(password: &str) -> Result<&str, ApiError> {
    if password.len() < 4 {
        return Err(ApiError::validation(
            "Password must be at least 4 characters",
        ));
    }
    Ok(password)
}
