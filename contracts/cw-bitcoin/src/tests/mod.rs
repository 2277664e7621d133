mod helper;
mod rotation;
