mod register;
mod user;
